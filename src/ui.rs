//! Rendering for burrow's progress view.
//!
//! [progress] draws the centered panel for the running task. Rendering only reads the
//! [crate::app::Session] and the theme.

pub mod progress;

pub(crate) use progress::render;
