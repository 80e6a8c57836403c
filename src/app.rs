//! Application layer for burrow.
//!
//! Turns a parsed command line into tasks ([plan]) and runs them one after another while
//! tracking conflicts, cancellation and the final outcome ([session]).
//!
//! The terminal loop and the headless runner in [crate::core::terminal] only call into
//! [Session]; rendering reads it through [crate::ui].

pub mod plan;
pub mod session;

pub use plan::plan_tasks;
pub use session::{KeypressResult, Outcome, Session};
