//! Internal library crate for burrow.
//!
//! The shipped application is the `bw` binary (`src/main.rs`).
//!
//! This library exists to share code between targets (binary, tests) and to keep modules organized.
//! The task engine in [core] is usable on its own: build a [core::Task], call
//! [core::Task::tick] until it stops running, and read its [core::Progress].

pub mod app;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;
