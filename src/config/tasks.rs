//! Task engine tuning from the `[tasks]` table.

use crate::core::task::DEFAULT_BUFFER_SIZE;
use crate::utils::clamp_setting;

use serde::Deserialize;

pub const DEFAULT_BUDGET: usize = 256;
pub const MAX_BUDGET: usize = 65536;
pub const MIN_BUFFER_SIZE: usize = 512;
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;
pub const DEFAULT_TICK_MS: u64 = 16;

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct Tasks {
    budget: usize,
    buffer_size: usize,
    tick_ms: u64,
}

impl Default for Tasks {
    fn default() -> Self {
        Tasks {
            budget: DEFAULT_BUDGET,
            buffer_size: DEFAULT_BUFFER_SIZE,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl Tasks {
    /// Bring every value into its supported range, warning about the ones that moved.
    pub(crate) fn clamped(self) -> Self {
        Tasks {
            budget: clamp_setting("tasks.budget", self.budget, 1, MAX_BUDGET),
            buffer_size: clamp_setting(
                "tasks.buffer_size",
                self.buffer_size,
                MIN_BUFFER_SIZE,
                MAX_BUFFER_SIZE,
            ),
            tick_ms: clamp_setting("tasks.tick_ms", self.tick_ms, 1, 1000),
        }
    }

    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[inline]
    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }
}
