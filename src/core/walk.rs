//! Resumable depth-first traversal of a single filesystem subtree.
//!
//! [TreeWalker] visits one entry per [TreeWalker::step] call, in directory-entry order,
//! pre-order, with an extra [WalkState::AtDirEnd] visit after each directory's children.
//! All state lives in the walker, so the caller can stop after any step and continue later.

use std::ffi::OsStr;
use std::fs::{self, Metadata, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::{IoContext, TaskError};

/// Classification of the entry the walker currently sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    NotStarted,
    AtDir,
    AtFile,
    AtSymlink,
    AtSpecial,
    AtDirEnd,
    Finished,
}

impl WalkState {
    /// True for states that name a real entry (not bookkeeping visits).
    #[inline]
    pub fn is_entry(self) -> bool {
        matches!(
            self,
            WalkState::AtDir | WalkState::AtFile | WalkState::AtSymlink | WalkState::AtSpecial
        )
    }
}

/// One open directory on the walk stack.
///
/// The bottom frame stands for the root entry and never holds a handle.
#[derive(Debug)]
struct DirFrame {
    entries: Option<ReadDir>,
    meta: Option<Metadata>,
}

#[derive(Debug)]
pub struct TreeWalker {
    path: PathBuf,
    stat: Option<Metadata>,
    stack: Vec<DirFrame>,
    dereference: bool,
    state: WalkState,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeWalker {
    pub fn new() -> Self {
        TreeWalker {
            path: PathBuf::new(),
            stat: None,
            stack: Vec::new(),
            dereference: false,
            state: WalkState::NotStarted,
        }
    }

    /// Begin a walk at `root`, dropping any previous traversal.
    ///
    /// On failure the walker is left exactly as it was.
    pub fn start(&mut self, root: &Path, dereference: bool) -> Result<(), TaskError> {
        let (stat, state) = classify(root, dereference).at(root)?;
        self.stack.clear();
        self.stack.push(DirFrame {
            entries: None,
            meta: None,
        });
        self.path = root.to_path_buf();
        self.stat = Some(stat);
        self.dereference = dereference;
        self.state = state;
        Ok(())
    }

    /// Advance by exactly one entry.
    pub fn step(&mut self) -> Result<(), TaskError> {
        match self.state {
            WalkState::NotStarted | WalkState::Finished => return Ok(()),
            WalkState::AtFile | WalkState::AtSymlink | WalkState::AtSpecial => {
                if self.stack.len() <= 1 {
                    self.finish();
                    return Ok(());
                }
                self.path.pop();
            }
            WalkState::AtDir => {
                let entries = fs::read_dir(&self.path).at(&self.path)?;
                self.stack.push(DirFrame {
                    entries: Some(entries),
                    meta: self.stat.clone(),
                });
            }
            WalkState::AtDirEnd => {
                self.stack.pop();
                if self.stack.len() <= 1 {
                    self.finish();
                    return Ok(());
                }
                self.path.pop();
            }
        }

        if self.stack.len() <= 1 {
            self.finish();
            return Ok(());
        }
        self.read_next()
    }

    /// Fetch the next entry of the innermost open directory.
    fn read_next(&mut self) -> Result<(), TaskError> {
        let Some(frame) = self.stack.last_mut() else {
            self.finish();
            return Ok(());
        };
        let next = match frame.entries.as_mut() {
            Some(entries) => entries.next(),
            None => None,
        };

        match next {
            None => {
                self.stat = frame.meta.clone();
                self.state = WalkState::AtDirEnd;
                Ok(())
            }
            Some(Err(e)) => Err(TaskError::io(&self.path, e)),
            Some(Ok(entry)) => self.enter(&entry.file_name()),
        }
    }

    fn enter(&mut self, name: &OsStr) -> Result<(), TaskError> {
        self.path.push(name);
        match classify(&self.path, self.dereference) {
            Ok((stat, state)) => {
                self.stat = Some(stat);
                self.state = state;
                Ok(())
            }
            Err(e) => {
                let err = TaskError::io(&self.path, e);
                self.path.pop();
                Err(err)
            }
        }
    }

    /// Stop the current walk early, releasing every open directory.
    pub fn finish(&mut self) {
        self.stack.clear();
        self.state = WalkState::Finished;
    }

    /// Release everything and go back to [WalkState::NotStarted].
    pub fn end(&mut self) {
        self.stack.clear();
        self.path.clear();
        self.stat = None;
        self.state = WalkState::NotStarted;
    }

    // Accessors

    #[inline]
    pub fn state(&self) -> WalkState {
        self.state
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.stat.as_ref()
    }

    /// Number of directories currently open.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    /// True while the walker sits on the entry it was started at.
    #[inline]
    pub fn at_root(&self) -> bool {
        self.depth() == 0 && self.state.is_entry()
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.stat.as_ref().map_or(0, Metadata::len)
    }
}

/// lstat `path` and classify it, optionally looking through symlinks.
///
/// A dangling link stays a symlink when dereferencing.
fn classify(path: &Path, dereference: bool) -> io::Result<(Metadata, WalkState)> {
    let lstat = fs::symlink_metadata(path)?;
    let ft = lstat.file_type();
    if ft.is_dir() {
        return Ok((lstat, WalkState::AtDir));
    }
    if ft.is_file() {
        return Ok((lstat, WalkState::AtFile));
    }
    if !ft.is_symlink() {
        return Ok((lstat, WalkState::AtSpecial));
    }
    if !dereference {
        return Ok((lstat, WalkState::AtSymlink));
    }
    match fs::metadata(path) {
        Ok(target) if target.is_dir() => Ok((target, WalkState::AtDir)),
        Ok(target) => Ok((target, WalkState::AtFile)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((lstat, WalkState::AtSymlink)),
        Err(e) => Err(e),
    }
}
