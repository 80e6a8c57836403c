//! Error types for the task engine.
//!
//! [TaskError] is what a failed [Task](crate::core::Task) keeps as its last error.
//! Conflicts that the task flags tolerate never become errors; everything else is fatal
//! to the whole task.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Any OS-level failure on a path.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination already exists and neither skip nor overwrite is active.
    #[error("{}: destination already exists", path.display())]
    Conflict { path: PathBuf },

    /// The task could not be constructed from the given arguments.
    #[error("invalid task: {0}")]
    InvalidRequest(String),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }

    /// The POSIX error code, if this came from the OS.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            TaskError::Io { source, .. } => source.raw_os_error(),
            TaskError::Conflict { .. } => Some(libc::EEXIST),
            TaskError::InvalidRequest(_) => None,
        }
    }

    /// The path the failure happened on.
    pub fn path(&self) -> Option<&Path> {
        match self {
            TaskError::Io { path, .. } | TaskError::Conflict { path } => Some(path),
            TaskError::InvalidRequest(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TaskError::Conflict { .. })
    }
}

/// Attach a path to a bare io::Error.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, TaskError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, TaskError> {
        self.map_err(|e| TaskError::io(path, e))
    }
}
