//! Building tasks from a [Request].
//!
//! Every task shares one source root, so command line paths are grouped by their parent
//! directory, keeping the order in which parents first appear. A single copy or move
//! source whose DEST is not an existing directory is renamed to DEST's final component.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::error::TaskError;
use crate::core::task::{Task, TaskFlags, TaskKind};
use crate::utils::cli::Request;
use crate::utils::split_entry;

type Group = (PathBuf, Vec<OsString>);

/// Plan the tasks for `req`, merging link flags from the config.
pub fn plan_tasks(req: &Request, config: &Config) -> Result<Vec<Task>, TaskError> {
    let buffer_size = config.tasks().buffer_size();

    if req.kind == TaskKind::Chmod {
        let recursive = req.flags.contains(TaskFlags::RECURSIVE_CHMOD);
        return group_by_parent(&req.paths)?
            .into_iter()
            .map(|(root, names)| Task::chmod(root, names, req.chmod, recursive))
            .collect();
    }

    let mut flags = config.behavior().flags() | req.flags;
    if req.kind != TaskKind::Copy {
        flags.remove(TaskFlags::DEREF_LINKS);
    }

    if req.kind == TaskKind::Remove {
        return group_by_parent(&req.paths)?
            .into_iter()
            .map(|(root, names)| Task::new(req.kind, flags, root.clone(), root, names, Vec::new()))
            .collect();
    }

    let dest = req
        .dest
        .as_deref()
        .ok_or_else(|| TaskError::InvalidRequest("missing destination".into()))?;

    let dest_is_dir = fs::metadata(dest).map(|m| m.is_dir()).unwrap_or(false);
    if let [single] = req.paths.as_slice()
        && !dest_is_dir
    {
        let (src_root, name) = entry(single)?;
        let (dest_root, new_name) = entry(dest)?;
        let task = Task::new(req.kind, flags, src_root, dest_root, vec![name], vec![new_name])?;
        return Ok(vec![task.with_buffer_size(buffer_size)]);
    }

    if !dest_is_dir {
        return Err(TaskError::InvalidRequest(format!(
            "target '{}' is not a directory",
            dest.display()
        )));
    }

    let dest_root = std::path::absolute(dest).map_err(|e| TaskError::io(dest, e))?;
    group_by_parent(&req.paths)?
        .into_iter()
        .map(|(root, names)| {
            Task::new(req.kind, flags, root, dest_root.clone(), names, Vec::new())
                .map(|t| t.with_buffer_size(buffer_size))
        })
        .collect()
}

fn entry(path: &Path) -> Result<(PathBuf, OsString), TaskError> {
    split_entry(path).ok_or_else(|| {
        TaskError::InvalidRequest(format!("'{}' does not name an entry", path.display()))
    })
}

fn group_by_parent(paths: &[PathBuf]) -> Result<Vec<Group>, TaskError> {
    let mut groups: Vec<Group> = Vec::new();
    for path in paths {
        let (parent, name) = entry(path)?;
        match groups.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, names)) => {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            None => groups.push((parent, vec![name])),
        }
    }
    Ok(groups)
}
