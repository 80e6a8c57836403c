//! The budget-driven task state machine.
//!
//! A [Task] realizes one bulk operation (copy, move, remove or chmod) over a list of
//! top-level entries that share a source root. The caller drives it with [Task::drive]
//! (or [Task::tick]) once per UI tick; each call does at most `budget` units of work,
//! one unit per entry visited or per buffer copied, and then returns. Nothing is kept
//! outside the task between calls, so the caller can redraw and poll input in between.
//!
//! Copy and move tasks first run an estimate pass that counts what will be done and how
//! many destinations already exist, then an execution pass. Chmod starts executing
//! right away.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

use crate::core::copy::{CopyJob, Pumped};
use crate::core::error::{IoContext, TaskError};
use crate::core::fsops::{
    change_owner, make_dir, place_symlink, relative_chmod, remove_empty_dir, same_volume, unlink,
};
use crate::core::resolve::{normalize, resolve_destination, rewrite_link_target};
use crate::core::walk::{TreeWalker, WalkState};

/// Default copy chunk size.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Copy,
    Move,
    Remove,
    Chmod,
}

impl TaskKind {
    #[inline]
    pub fn copies(self) -> bool {
        matches!(self, TaskKind::Copy | TaskKind::Move)
    }

    #[inline]
    pub fn removes(self) -> bool {
        matches!(self, TaskKind::Move | TaskKind::Remove)
    }

    pub fn verb(self) -> &'static str {
        match self {
            TaskKind::Copy => "Copying",
            TaskKind::Move => "Moving",
            TaskKind::Remove => "Removing",
            TaskKind::Chmod => "Changing permissions",
        }
    }
}

/// Independent task options, stored as bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFlags(u8);

impl TaskFlags {
    pub const NONE: TaskFlags = TaskFlags(0);
    pub const SKIP_CONFLICTS: TaskFlags = TaskFlags(1 << 0);
    pub const OVERWRITE_CONFLICTS: TaskFlags = TaskFlags(1 << 1);
    pub const SKIP_LINKS: TaskFlags = TaskFlags(1 << 2);
    pub const RAW_LINKS: TaskFlags = TaskFlags(1 << 3);
    pub const DEREF_LINKS: TaskFlags = TaskFlags(1 << 4);
    pub const RECURSIVE_CHMOD: TaskFlags = TaskFlags(1 << 5);

    #[inline]
    pub fn contains(self, other: TaskFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: TaskFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: TaskFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for TaskFlags {
    type Output = TaskFlags;

    fn bitor(self, rhs: TaskFlags) -> TaskFlags {
        TaskFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TaskFlags {
    fn bitor_assign(&mut self, rhs: TaskFlags) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Estimating,
    Executing,
    Done,
    Failed,
    Clean,
}

/// How to treat destinations that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    Overwrite,
}

/// Progress counters. They only grow until the task is cleaned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub files_total: u64,
    pub files_done: u64,
    pub dirs_total: u64,
    pub dirs_done: u64,
    pub size_total: u64,
    pub size_done: u64,
    pub conflicts: u64,
    pub symlinks: u64,
    pub specials: u64,
}

/// Permission and ownership change applied by a chmod task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChmodSpec {
    pub set: u32,
    pub clear: u32,
    pub owner: Option<u32>,
    pub group: Option<u32>,
}

impl ChmodSpec {
    pub fn is_noop(&self) -> bool {
        self.set == 0 && self.clear == 0 && self.owner.is_none() && self.group.is_none()
    }
}

/// What the estimate pass saw under one top-level entry.
#[derive(Debug, Clone, Copy, Default)]
struct Planned {
    files: u64,
    dirs: u64,
    size: u64,
}

type Action = fn(&mut Task, &mut usize);

pub struct Task {
    kind: TaskKind,
    flags: TaskFlags,
    source_root: PathBuf,
    dest_root: PathBuf,
    sources: Vec<OsString>,
    renamed: Vec<OsString>,
    current: usize,
    walker: TreeWalker,
    copy: Option<CopyJob>,
    buffer: Vec<u8>,
    progress: Progress,
    planned: Vec<Planned>,
    // One entry per directory entered while copying: did we create it?
    made_dirs: Vec<bool>,
    // One counter per directory entered while removing: entries left behind in it.
    kept: Vec<u64>,
    bytes_copied: u64,
    error: Option<TaskError>,
    phase: Phase,
    chmod: ChmodSpec,
}

impl Task {
    /// Create a copy, move or remove task.
    ///
    /// `sources` are entry names inside `source_root`. `renamed` is either empty or gives
    /// the destination name for each source.
    pub fn new(
        kind: TaskKind,
        flags: TaskFlags,
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        sources: Vec<OsString>,
        renamed: Vec<OsString>,
    ) -> Result<Self, TaskError> {
        if kind == TaskKind::Chmod {
            return Err(TaskError::InvalidRequest(
                "chmod tasks are built with Task::chmod".into(),
            ));
        }
        if flags.contains(TaskFlags::SKIP_CONFLICTS)
            && flags.contains(TaskFlags::OVERWRITE_CONFLICTS)
        {
            return Err(TaskError::InvalidRequest(
                "skip and overwrite are mutually exclusive".into(),
            ));
        }
        Self::build(
            kind,
            flags,
            source_root.into(),
            dest_root.into(),
            sources,
            renamed,
            ChmodSpec::default(),
        )
    }

    /// Create a chmod/chown task. Without `recursive` only the named entries change.
    pub fn chmod(
        source_root: impl Into<PathBuf>,
        sources: Vec<OsString>,
        spec: ChmodSpec,
        recursive: bool,
    ) -> Result<Self, TaskError> {
        if spec.is_noop() {
            return Err(TaskError::InvalidRequest("nothing to change".into()));
        }
        let flags = if recursive {
            TaskFlags::RECURSIVE_CHMOD
        } else {
            TaskFlags::NONE
        };
        let root = source_root.into();
        Self::build(
            TaskKind::Chmod,
            flags,
            root.clone(),
            root,
            sources,
            Vec::new(),
            spec,
        )
    }

    fn build(
        kind: TaskKind,
        flags: TaskFlags,
        source_root: PathBuf,
        dest_root: PathBuf,
        sources: Vec<OsString>,
        renamed: Vec<OsString>,
        chmod: ChmodSpec,
    ) -> Result<Self, TaskError> {
        if sources.is_empty() {
            return Err(TaskError::InvalidRequest("no sources given".into()));
        }
        if !renamed.is_empty() && renamed.len() != sources.len() {
            return Err(TaskError::InvalidRequest(format!(
                "{} sources but {} new names",
                sources.len(),
                renamed.len()
            )));
        }
        if let Some(bad) = sources.iter().chain(&renamed).find(|n| !is_plain_name(n)) {
            return Err(TaskError::InvalidRequest(format!(
                "'{}' is not a plain entry name",
                bad.to_string_lossy()
            )));
        }
        if kind.copies() {
            let from = real_root(&source_root);
            let to = real_root(&dest_root);
            for (i, name) in sources.iter().enumerate() {
                let src = from.join(name);
                if to.join(renamed.get(i).unwrap_or(name)).starts_with(&src) {
                    return Err(TaskError::InvalidRequest(format!(
                        "cannot place '{}' inside itself",
                        src.display()
                    )));
                }
            }
        }

        let phase = if kind == TaskKind::Chmod {
            Phase::Executing
        } else {
            Phase::Estimating
        };
        let planned = vec![Planned::default(); sources.len()];

        Ok(Task {
            kind,
            flags,
            source_root,
            dest_root,
            sources,
            renamed,
            current: 0,
            walker: TreeWalker::new(),
            copy: None,
            buffer: vec![0; DEFAULT_BUFFER_SIZE],
            progress: Progress::default(),
            planned,
            made_dirs: Vec::new(),
            kept: Vec::new(),
            bytes_copied: 0,
            error: None,
            phase,
            chmod,
        })
    }

    /// Use `size` byte chunks for file copies.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer = vec![0; size.max(1)];
        self
    }

    /// Replace the conflict flags, typically after the estimate reported conflicts.
    pub fn set_conflict_policy(&mut self, policy: ConflictPolicy) {
        self.flags
            .remove(TaskFlags::SKIP_CONFLICTS | TaskFlags::OVERWRITE_CONFLICTS);
        self.flags.insert(match policy {
            ConflictPolicy::Skip => TaskFlags::SKIP_CONFLICTS,
            ConflictPolicy::Overwrite => TaskFlags::OVERWRITE_CONFLICTS,
        });
    }

    /// Do up to `budget` units of work.
    ///
    /// When the last source finishes its walk the task moves to `on_end`. Returns early
    /// after each source so the caller sees the transition.
    pub fn drive(&mut self, budget: usize, on_end: Phase) {
        if !self.is_running() || budget == 0 {
            return;
        }
        let mut budget = budget;

        if self.walker.state() == WalkState::NotStarted {
            let root = self.source_root.join(&self.sources[self.current]);
            let dereference =
                self.kind == TaskKind::Copy && self.flags.contains(TaskFlags::DEREF_LINKS);
            if let Err(e) = self.walker.start(&root, dereference) {
                self.fail(e);
                return;
            }
            tracing::debug!(path = %root.display(), phase = ?self.phase, "walking source");
        }

        let action: Action = match (self.phase, self.kind) {
            (Phase::Estimating, _) => Task::estimate_step,
            (_, TaskKind::Chmod) => Task::chmod_step,
            _ => Task::copy_remove_step,
        };

        while budget > 0 && self.error.is_none() && self.walker.state() != WalkState::Finished {
            action(self, &mut budget);
        }

        if self.error.is_some() {
            return;
        }
        if self.walker.state() == WalkState::Finished {
            self.walker.end();
            self.current += 1;
            if self.current == self.sources.len() {
                self.current = 0;
                tracing::info!(kind = ?self.kind, from = ?self.phase, to = ?on_end, "task phase change");
                self.phase = on_end;
            }
        }
    }

    /// [Task::drive] with the natural next phase: estimate, then execute, then done.
    pub fn tick(&mut self, budget: usize) {
        let next = match self.phase {
            Phase::Estimating => Phase::Executing,
            _ => Phase::Done,
        };
        self.drive(budget, next);
    }

    /// Release descriptors, directory handles and lists. Safe in any phase.
    pub fn clean(&mut self) {
        self.copy = None;
        self.walker.end();
        self.sources.clear();
        self.renamed.clear();
        self.planned.clear();
        self.made_dirs.clear();
        self.progress = Progress::default();
        self.current = 0;
        self.kept.clear();
        self.error = None;
        self.phase = Phase::Clean;
    }

    fn fail(&mut self, err: TaskError) {
        tracing::warn!(kind = ?self.kind, error = %err, "task failed");
        self.copy = None;
        self.walker.end();
        self.made_dirs.clear();
        self.kept.clear();
        self.error = Some(err);
        self.phase = Phase::Failed;
    }

    fn destination(&self) -> Result<PathBuf, TaskError> {
        let current = self.walker.path();
        resolve_destination(
            current,
            &self.source_root,
            &self.dest_root,
            &self.sources[self.current],
            self.rename_target(),
        )
        .ok_or_else(|| {
            TaskError::InvalidRequest(format!(
                "{} is outside {}",
                current.display(),
                self.source_root.display()
            ))
        })
    }

    fn rename_target(&self) -> Option<&OsStr> {
        self.renamed.get(self.current).map(OsString::as_os_str)
    }

    // Estimate

    fn estimate_step(&mut self, budget: &mut usize) {
        let state = self.walker.state();
        let size = self.walker.size();
        let planned = &mut self.planned[self.current];
        let p = &mut self.progress;

        match state {
            WalkState::AtSymlink | WalkState::AtFile => {
                if state == WalkState::AtSymlink {
                    p.symlinks += 1;
                }
                p.files_total += 1;
                p.size_total += size;
                planned.files += 1;
                planned.size += size;
            }
            WalkState::AtDir => {
                p.dirs_total += 1;
                planned.dirs += 1;
            }
            WalkState::AtSpecial => p.specials += 1,
            _ => {}
        }

        if self.kind.copies()
            && matches!(
                state,
                WalkState::AtDir | WalkState::AtFile | WalkState::AtSymlink
            )
            && let Ok(dest) = self.destination()
            && fs::symlink_metadata(&dest).is_ok()
        {
            self.progress.conflicts += 1;
        }

        if let Err(e) = self.walker.step() {
            self.fail(e);
        }
        *budget = budget.saturating_sub(1);
    }

    // Copy / move / remove

    fn copy_remove_step(&mut self, budget: &mut usize) {
        if let Err(e) = self.copy_remove_entry(budget) {
            self.fail(e);
            return;
        }
        if self.copy.is_some() || self.walker.state() == WalkState::Finished {
            return;
        }
        if let Err(e) = self.walker.step() {
            self.fail(e);
        }
    }

    fn copy_remove_entry(&mut self, budget: &mut usize) -> Result<(), TaskError> {
        let copy = self.kind.copies();
        let remove = self.kind.removes();

        if copy && remove && self.copy.is_none() && self.walker.at_root() && self.fast_rename()? {
            *budget = budget.saturating_sub(1);
            return Ok(());
        }

        let path = self.walker.path().to_path_buf();
        let mode = self.walker.metadata().map_or(0o644, |m| m.mode());
        let size = self.walker.size();
        let skip = self.flags.contains(TaskFlags::SKIP_CONFLICTS);

        match self.walker.state() {
            WalkState::AtSymlink => {
                if self.flags.contains(TaskFlags::SKIP_LINKS) {
                    if remove {
                        self.keep_entry();
                    }
                } else {
                    let placed = if copy { self.copy_link(&path, skip)? } else { true };
                    if remove && placed {
                        unlink(&path)?;
                    } else if remove {
                        self.keep_entry();
                    }
                }
                self.progress.files_done += 1;
                self.progress.size_done += size;
            }
            WalkState::AtFile => {
                let mut copied = !copy;
                if copy {
                    if self.copy.is_none() {
                        let dest = self.destination()?;
                        self.copy = CopyJob::open(&path, &dest, mode, skip)?;
                    }
                    match self.copy.as_mut() {
                        Some(job) => {
                            let before = job.written();
                            let res = job.pump(&mut self.buffer, budget);
                            self.bytes_copied += job.written() - before;
                            if let Pumped::Pending = res? {
                                return Ok(());
                            }
                            self.copy = None;
                            copied = true;
                        }
                        None => tracing::debug!(path = %path.display(), "skipped existing file"),
                    }
                }
                if remove && copied {
                    unlink(&path)?;
                } else if remove {
                    self.keep_entry();
                }
                self.progress.files_done += 1;
                self.progress.size_done += size;
            }
            WalkState::AtDir => {
                if copy {
                    let dest = self.destination()?;
                    let created = make_dir(&dest, mode | 0o700)?;
                    if !created {
                        let tolerated =
                            skip || self.flags.contains(TaskFlags::OVERWRITE_CONFLICTS);
                        let is_dir = fs::metadata(&dest).map(|m| m.is_dir()).unwrap_or(false);
                        if !tolerated || !is_dir {
                            return Err(TaskError::Conflict { path: dest });
                        }
                    }
                    self.made_dirs.push(created);
                    self.progress.dirs_done += 1;
                }
                if remove {
                    self.kept.push(0);
                }
            }
            WalkState::AtSpecial => {
                if remove {
                    unlink(&path)?;
                }
            }
            WalkState::AtDirEnd => {
                if copy && self.made_dirs.pop() == Some(true) && mode & 0o700 != 0o700 {
                    let dest = self.destination()?;
                    relative_chmod(&dest, 0, 0o700 & !mode)?;
                }
                if remove {
                    let kept_here = self.kept.pop().unwrap_or(0);
                    match remove_empty_dir(&path) {
                        Ok(()) => {}
                        Err(e) if kept_here > 0 && e.raw_os_error() == Some(libc::ENOTEMPTY) => {
                            tracing::debug!(
                                path = %path.display(),
                                kept = kept_here,
                                "left non-empty directory"
                            );
                            self.keep_entry();
                        }
                        Err(e) => return Err(e),
                    }
                    if !copy {
                        self.progress.dirs_done += 1;
                    }
                }
            }
            WalkState::NotStarted | WalkState::Finished => {}
        }

        *budget = budget.saturating_sub(1);
        Ok(())
    }

    /// Record that the current entry stays behind in its parent directory.
    fn keep_entry(&mut self) {
        if let Some(count) = self.kept.last_mut() {
            *count += 1;
        }
    }

    /// Duplicate the symlink at `path`. Returns false if an existing entry was kept.
    fn copy_link(&self, path: &Path, skip: bool) -> Result<bool, TaskError> {
        let dest = self.destination()?;
        let target = fs::read_link(path).at(path)?;
        let target = if self.flags.contains(TaskFlags::RAW_LINKS) {
            target
        } else {
            rewrite_link_target(
                path,
                &target,
                &self.source_root,
                &self.dest_root,
                &self.sources[self.current],
                self.rename_target(),
            )
        };
        place_symlink(&target, &dest, skip)
    }

    /// Move the whole current source with one rename if that is possible.
    ///
    /// Never used when the destination exists, so conflict flags keep their meaning.
    fn fast_rename(&mut self) -> Result<bool, TaskError> {
        let dest = self.destination()?;
        if fs::symlink_metadata(&dest).is_ok() {
            return Ok(false);
        }
        if !same_volume(&self.source_root, &self.dest_root)? {
            return Ok(false);
        }

        let src = self.walker.path().to_path_buf();
        match fs::rename(&src, &dest) {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == Some(libc::EXDEV) => return Ok(false),
            Err(e) => return Err(TaskError::io(&src, e)),
        }
        tracing::debug!(from = %src.display(), to = %dest.display(), "moved by rename");

        let planned = self.planned[self.current];
        self.progress.files_done += planned.files;
        self.progress.dirs_done += planned.dirs;
        self.progress.size_done += planned.size;
        self.walker.finish();
        Ok(true)
    }

    // Chmod

    fn chmod_step(&mut self, budget: &mut usize) {
        let recursive = self.flags.contains(TaskFlags::RECURSIVE_CHMOD);
        if let Err(e) = self.chmod_entry(recursive) {
            self.fail(e);
            return;
        }
        if !recursive {
            self.walker.finish();
        } else if let Err(e) = self.walker.step() {
            self.fail(e);
        }
        *budget = budget.saturating_sub(1);
    }

    fn chmod_entry(&mut self, recursive: bool) -> Result<(), TaskError> {
        let path = self.walker.path();
        let spec = self.chmod;
        let p = &mut self.progress;
        // Recursive changes add bits to a directory before entering it and clear bits
        // after its children, so the walk can always get in and is never locked out.
        let (set, clear, owners) = match self.walker.state() {
            WalkState::AtFile | WalkState::AtSymlink => {
                p.files_total += 1;
                p.files_done += 1;
                (spec.set, spec.clear, true)
            }
            WalkState::AtSpecial => {
                p.specials += 1;
                (spec.set, spec.clear, true)
            }
            WalkState::AtDir => {
                p.dirs_total += 1;
                p.dirs_done += 1;
                if recursive {
                    (spec.set, 0, true)
                } else {
                    (spec.set, spec.clear, true)
                }
            }
            WalkState::AtDirEnd => (0, spec.clear, false),
            WalkState::NotStarted | WalkState::Finished => return Ok(()),
        };

        let is_link = self.walker.state() == WalkState::AtSymlink;
        if !is_link && (set != 0 || clear != 0) {
            relative_chmod(path, set, clear)?;
        }
        if owners {
            change_owner(path, spec.owner, spec.group, is_link)?;
        }
        Ok(())
    }

    // Accessors

    #[inline]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[inline]
    pub fn flags(&self) -> TaskFlags {
        self.flags
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    #[inline]
    pub fn last_error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    #[inline]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    #[inline]
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    #[inline]
    pub fn sources(&self) -> &[OsString] {
        &self.sources
    }

    #[inline]
    pub fn chmod_spec(&self) -> &ChmodSpec {
        &self.chmod
    }

    /// Bytes actually written by the copy engine, excluding renames.
    #[inline]
    pub fn bytes_copied(&self) -> u64 {
        self.bytes_copied
    }

    /// Bytes written so far for the file currently being copied.
    pub fn in_flight_bytes(&self) -> u64 {
        self.copy.as_ref().map_or(0, CopyJob::written)
    }

    /// The entry the task is working on, if a walk is in progress.
    pub fn current_path(&self) -> Option<&Path> {
        match self.walker.state() {
            WalkState::NotStarted | WalkState::Finished => None,
            _ => Some(self.walker.path()),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Estimating | Phase::Executing)
    }

    /// Fraction of the planned work that is done, for progress bars.
    pub fn completion(&self) -> f64 {
        let p = &self.progress;
        let ratio = if p.size_total > 0 {
            (p.size_done + self.in_flight_bytes()) as f64 / p.size_total as f64
        } else {
            let total = p.files_total + p.dirs_total;
            if total == 0 {
                return if self.phase == Phase::Done { 1.0 } else { 0.0 };
            }
            (p.files_done + p.dirs_done) as f64 / total as f64
        };
        ratio.clamp(0.0, 1.0)
    }
}

/// `path` with symlinks resolved when it exists, lexically cleaned otherwise.
fn real_root(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        normalize(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
    })
}

/// A single path component that is not `.` or `..`.
fn is_plain_name(name: &OsStr) -> bool {
    let mut comps = Path::new(name).components();
    matches!(
        (comps.next(), comps.next()),
        (Some(Component::Normal(_)), None)
    )
}
