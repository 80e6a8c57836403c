//! Sequential queue of independent tasks.
//!
//! Each [Task] owns disjoint state; the queue only decides which one the caller drives.

use std::collections::VecDeque;

use crate::core::task::{Phase, Progress, Task};

/// Totals of tasks that already left the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Finished {
    pub tasks: usize,
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

impl Finished {
    fn absorb(&mut self, p: &Progress) {
        self.tasks += 1;
        self.files += p.files_done;
        self.dirs += p.dirs_done;
        self.bytes += p.size_done;
    }
}

#[derive(Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    finished: Finished,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn current(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn current_mut(&mut self) -> Option<&mut Task> {
        self.tasks.front_mut()
    }

    /// Retire the front task once it is done. A failed task stays in front so the
    /// caller can report it.
    pub fn advance(&mut self) -> bool {
        match self.tasks.front() {
            Some(t) if t.phase() == Phase::Done => {
                if let Some(mut done) = self.tasks.pop_front() {
                    self.finished.absorb(done.progress());
                    done.clean();
                }
                true
            }
            _ => false,
        }
    }

    /// Tear down every task, including the one in flight.
    pub fn cancel(&mut self) {
        for task in self.tasks.iter_mut() {
            task.clean();
        }
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn finished(&self) -> Finished {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::task::{TaskFlags, TaskKind};
    use std::error;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_queue_runs_tasks_in_order() -> Result<(), Box<dyn error::Error>> {
        let src = tempdir()?;
        let dst = tempdir()?;
        fs::write(src.path().join("one"), "1")?;
        fs::write(src.path().join("two"), "22")?;

        let mut q = TaskQueue::new();
        for name in ["one", "two"] {
            q.push(Task::new(
                TaskKind::Copy,
                TaskFlags::NONE,
                src.path(),
                dst.path(),
                vec![OsString::from(name)],
                Vec::new(),
            )?);
        }
        assert_eq!(q.len(), 2);

        while let Some(task) = q.current_mut() {
            task.tick(4);
            q.advance();
        }

        assert!(q.is_empty());
        assert_eq!(q.finished().tasks, 2);
        assert_eq!(q.finished().files, 2);
        assert_eq!(q.finished().bytes, 3);
        assert_eq!(fs::read_to_string(dst.path().join("two"))?, "22");
        Ok(())
    }

    #[test]
    fn test_cancel_drops_everything() -> Result<(), Box<dyn error::Error>> {
        let src = tempdir()?;
        fs::write(src.path().join("f"), "x")?;
        let mut q = TaskQueue::new();
        q.push(Task::new(
            TaskKind::Remove,
            TaskFlags::NONE,
            src.path(),
            src.path(),
            vec![OsString::from("f")],
            Vec::new(),
        )?);
        q.cancel();
        assert!(q.is_empty());
        assert!(src.path().join("f").exists());
        Ok(())
    }
}
