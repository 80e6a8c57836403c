//! Configuration for burrow.
//!
//! - [load]: finding, reading and generating `burrow.toml` ([Config]).
//! - [tasks]: work budget, copy buffer size and refresh interval.
//! - [behavior]: default task flags and the conflict policy.
//! - [theme]: progress panel colors.

pub mod behavior;
pub mod load;
pub mod tasks;
pub mod theme;

pub use behavior::{Behavior, ConflictMode};
pub use load::Config;
pub use tasks::Tasks;
pub use theme::Theme;
