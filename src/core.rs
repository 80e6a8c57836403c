//! Core runtime logic for burrow.
//!
//! This module contains the non-UI "engine" pieces:
//! - [walk]: resumable depth-first traversal of one subtree ([TreeWalker]).
//! - [resolve]: mapping visited source paths to destination paths.
//! - [copy]: chunked, resumable file copies ([CopyJob]).
//! - [task]: the budget-driven copy/move/remove/chmod state machine ([Task]).
//! - [queue]: running several tasks one after another ([TaskQueue]).
//! - [fsops]: the filesystem primitives the task uses.
//! - [error]: [TaskError].
//! - [formatter]: sizes, modes and paths for display.
//! - [terminal]: terminal setup/teardown and the loop that drives tasks between redraws.
//!
//! Most callers will import [Task], [TaskKind], [TaskFlags] and [Phase] from this module.

pub mod copy;
pub mod error;
pub mod formatter;
pub mod fsops;
pub mod queue;
pub mod resolve;
pub mod task;
pub mod terminal;
pub mod walk;

pub use copy::{CopyJob, Pumped};
pub use error::TaskError;
pub use formatter::{fit_path, format_bytes, format_bytes_ratio, format_mode, format_mode_change};
pub use queue::TaskQueue;
pub use resolve::resolve_destination;
pub use task::{ChmodSpec, ConflictPolicy, Phase, Progress, Task, TaskFlags, TaskKind};
pub use walk::{TreeWalker, WalkState};
