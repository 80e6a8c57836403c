//! Default task behavior from the `[behavior]` table.
//!
//! Command line flags are merged on top of these in [crate::app::plan].

use crate::core::task::{ConflictPolicy, TaskFlags};

use serde::Deserialize;

/// What to do when the estimate finds existing destinations.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    #[default]
    Ask,
    Skip,
    Overwrite,
    Abort,
}

impl ConflictMode {
    /// The policy to apply without asking, if any.
    pub fn policy(self) -> Option<ConflictPolicy> {
        match self {
            ConflictMode::Skip => Some(ConflictPolicy::Skip),
            ConflictMode::Overwrite => Some(ConflictPolicy::Overwrite),
            ConflictMode::Ask | ConflictMode::Abort => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(default)]
pub struct Behavior {
    dereference: bool,
    raw_links: bool,
    skip_links: bool,
    conflicts: ConflictMode,
}

impl Behavior {
    /// Task flags implied by these defaults.
    pub fn flags(&self) -> TaskFlags {
        let mut flags = TaskFlags::NONE;
        if self.dereference {
            flags |= TaskFlags::DEREF_LINKS;
        }
        if self.raw_links {
            flags |= TaskFlags::RAW_LINKS;
        }
        if self.skip_links {
            flags |= TaskFlags::SKIP_LINKS;
        }
        flags
    }

    #[inline]
    pub fn dereference(&self) -> bool {
        self.dereference
    }

    #[inline]
    pub fn conflicts(&self) -> ConflictMode {
        self.conflicts
    }
}
