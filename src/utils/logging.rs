//! Optional file logging.
//!
//! The terminal belongs to the progress panel, so log output goes to
//! `$XDG_STATE_HOME/burrow/bw.log` (or the local data dir). Logging is off unless
//! `BW_LOG` is set; its value is an `EnvFilter` directive such as `debug` or
//! `burrow::core=trace`.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BW_LOG";

/// Install the global subscriber. Returns the log file path when logging is active.
pub fn init() -> Option<PathBuf> {
    let directive = std::env::var(LOG_ENV).ok()?;
    let dir = dirs::state_dir()
        .or_else(dirs::data_local_dir)?
        .join("burrow");
    fs::create_dir_all(&dir).ok()?;

    let path = dir.join("bw.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;

    Some(path)
}
