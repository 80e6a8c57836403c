//! Miscellaneous utility functions for burrow.
//!
//! - [cli]: command line parsing and help text.
//! - [helpers]: color parsing, home directory handling, setting clamps, mode parsing and
//!   splitting command line paths into (root, entry) pairs.
//! - [logging]: the optional file logger.

pub mod cli;
pub mod helpers;
pub mod logging;

pub use helpers::{
    clamp_setting, get_home, parse_color, parse_id, parse_mode, shorten_home_path, split_entry,
};
