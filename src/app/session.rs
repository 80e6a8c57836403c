//! Running a queue of tasks on behalf of the terminal loop.
//!
//! A [Session] drives the front task once per tick, stops to ask about conflicts once the
//! estimate is known, and records how the run ended.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::ConflictMode;
use crate::core::formatter::{format_bytes, format_mode_change};
use crate::core::queue::{Finished, TaskQueue};
use crate::core::task::{ConflictPolicy, Phase, Task, TaskFlags, TaskKind};

pub enum KeypressResult {
    Continue,
    Consumed,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Finished,
    Failed(String),
    Cancelled,
    Aborted { conflicts: u64 },
}

impl Outcome {
    #[inline]
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Running)
    }
}

pub struct Session {
    queue: TaskQueue,
    kind: TaskKind,
    total: usize,
    budget: usize,
    conflicts: ConflictMode,
    interactive: bool,
    prompt: Option<u64>,
    outcome: Outcome,
}

impl Session {
    /// `interactive` allows asking about conflicts; otherwise [ConflictMode::Ask] aborts.
    pub fn new(tasks: Vec<Task>, budget: usize, conflicts: ConflictMode, interactive: bool) -> Self {
        let kind = tasks.first().map_or(TaskKind::Copy, Task::kind);
        let total = tasks.len();
        let mut queue = TaskQueue::new();
        for task in tasks {
            queue.push(task);
        }
        Session {
            queue,
            kind,
            total,
            budget: budget.max(1),
            conflicts,
            interactive,
            prompt: None,
            outcome: Outcome::Running,
        }
    }

    /// Drive the front task once. Returns true if anything may have changed.
    pub fn tick(&mut self) -> bool {
        if self.outcome.is_final() || self.prompt.is_some() {
            return false;
        }
        let Some(task) = self.queue.current_mut() else {
            self.outcome = Outcome::Finished;
            return true;
        };

        let before = task.phase();
        task.tick(self.budget);
        match task.phase() {
            Phase::Executing if before == Phase::Estimating => self.after_estimate(),
            Phase::Failed => {
                let msg = task
                    .last_error()
                    .map_or_else(|| "task failed".to_string(), ToString::to_string);
                self.outcome = Outcome::Failed(msg);
            }
            Phase::Done => {
                self.queue.advance();
                if self.queue.is_empty() {
                    self.outcome = Outcome::Finished;
                }
            }
            _ => {}
        }
        true
    }

    fn after_estimate(&mut self) {
        let Some(task) = self.queue.current_mut() else {
            return;
        };
        let conflicts = task.progress().conflicts;
        let flags = task.flags();
        if conflicts == 0
            || flags.contains(TaskFlags::SKIP_CONFLICTS)
            || flags.contains(TaskFlags::OVERWRITE_CONFLICTS)
        {
            return;
        }

        match self.conflicts.policy() {
            Some(policy) => task.set_conflict_policy(policy),
            None if self.interactive && self.conflicts == ConflictMode::Ask => {
                self.prompt = Some(conflicts)
            }
            None => self.abort(conflicts),
        }
    }

    /// Answer the conflict prompt. `None` aborts the whole run.
    pub fn resolve_conflicts(&mut self, choice: Option<ConflictPolicy>) {
        let Some(conflicts) = self.prompt.take() else {
            return;
        };
        if let Some(policy) = choice
            && let Some(task) = self.queue.current_mut()
        {
            tracing::info!(conflicts, ?policy, "conflict policy chosen");
            task.set_conflict_policy(policy);
            return;
        }
        self.abort(conflicts);
    }

    fn abort(&mut self, conflicts: u64) {
        tracing::info!(conflicts, "aborted on conflicts");
        self.queue.cancel();
        self.outcome = Outcome::Aborted { conflicts };
    }

    /// Tear down the running task and drop the rest of the queue.
    pub fn cancel(&mut self) {
        if self.outcome.is_final() {
            return;
        }
        tracing::info!("cancelled by user");
        self.prompt = None;
        self.queue.cancel();
        self.outcome = Outcome::Cancelled;
    }

    pub fn handle_keypress(&mut self, key: KeyEvent) -> KeypressResult {
        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);

        if self.prompt.is_some() && !ctrl_c {
            match key.code {
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    self.resolve_conflicts(Some(ConflictPolicy::Skip));
                    return KeypressResult::Consumed;
                }
                KeyCode::Char('o') | KeyCode::Char('O') => {
                    self.resolve_conflicts(Some(ConflictPolicy::Overwrite));
                    return KeypressResult::Consumed;
                }
                KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.resolve_conflicts(None);
                    return KeypressResult::Quit;
                }
                _ => return KeypressResult::Continue,
            }
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.cancel();
                KeypressResult::Quit
            }
            _ if ctrl_c => {
                self.cancel();
                KeypressResult::Quit
            }
            _ => KeypressResult::Continue,
        }
    }

    /// One-line report of everything that completed.
    pub fn summary(&self) -> String {
        let f = self.queue.finished();
        let verb = match self.kind {
            TaskKind::Copy => "Copied",
            TaskKind::Move => "Moved",
            TaskKind::Remove => "Removed",
            TaskKind::Chmod => "Changed",
        };
        match self.kind {
            TaskKind::Chmod => format!("{}: {} files, {} directories", verb, f.files, f.dirs),
            _ => format!(
                "{}: {} files, {} directories, {}",
                verb,
                f.files,
                f.dirs,
                format_bytes(f.bytes)
            ),
        }
    }

    /// Short description of a chmod request for titles, empty for other kinds.
    pub fn mode_change(&self) -> String {
        match self.current() {
            Some(task) if task.kind() == TaskKind::Chmod => {
                let spec = task.chmod_spec();
                format_mode_change(spec.set, spec.clear)
            }
            _ => String::new(),
        }
    }

    // Getters

    #[inline]
    pub fn current(&self) -> Option<&Task> {
        self.queue.current()
    }

    #[inline]
    pub fn prompt(&self) -> Option<u64> {
        self.prompt
    }

    #[inline]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    #[inline]
    pub fn finished(&self) -> Finished {
        self.queue.finished()
    }

    /// 1-based index of the running task and the number of tasks planned.
    pub fn position(&self) -> (usize, usize) {
        let index = (self.total - self.queue.len() + 1).min(self.total);
        (index, self.total)
    }
}
