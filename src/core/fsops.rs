//! Thin wrappers over the filesystem primitives the task engine needs.
//!
//! Each helper reports failures as [TaskError::Io] carrying the path it failed on.

use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt, chown, lchown, symlink};
use std::path::Path;

use crate::core::error::{IoContext, TaskError};

/// Permission bits chmod can change (rwx for all classes plus setuid/setgid/sticky).
pub const MODE_MASK: u32 = 0o7777;

/// True if both paths live on the same device.
pub fn same_volume(a: &Path, b: &Path) -> Result<bool, TaskError> {
    let da = fs::metadata(a).at(a)?.dev();
    let db = fs::metadata(b).at(b)?.dev();
    Ok(da == db)
}

/// Create one directory with `mode` (subject to the umask).
///
/// Returns `Ok(false)` if something already exists at `path`.
pub fn make_dir(path: &Path, mode: u32) -> Result<bool, TaskError> {
    match DirBuilder::new().mode(mode & MODE_MASK).create(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(TaskError::io(path, e)),
    }
}

/// Set the permission bits of `path` to exactly `mode`.
pub fn set_mode(path: &Path, mode: u32) -> Result<(), TaskError> {
    fs::set_permissions(path, Permissions::from_mode(mode & MODE_MASK)).at(path)
}

/// Add `set` bits and remove `clear` bits from the current mode of `path`.
///
/// Returns the mode that was applied.
pub fn relative_chmod(path: &Path, set: u32, clear: u32) -> Result<u32, TaskError> {
    let current = fs::metadata(path).at(path)?.mode() & MODE_MASK;
    let mode = apply_mode(current, set, clear);
    if mode != current {
        set_mode(path, mode)?;
    }
    Ok(mode)
}

#[inline]
pub fn apply_mode(current: u32, set: u32, clear: u32) -> u32 {
    ((current | set) & !clear) & MODE_MASK
}

/// Change owner and/or group. `None` leaves that id untouched.
///
/// Symlinks are changed themselves, never their targets.
pub fn change_owner(
    path: &Path,
    owner: Option<u32>,
    group: Option<u32>,
    is_link: bool,
) -> Result<(), TaskError> {
    if owner.is_none() && group.is_none() {
        return Ok(());
    }
    if is_link {
        lchown(path, owner, group).at(path)
    } else {
        chown(path, owner, group).at(path)
    }
}

/// Create a symlink at `dst` pointing to `target`.
///
/// An existing `dst` is left alone when `skip_existing` is set (`Ok(false)`), and
/// replaced otherwise.
pub fn place_symlink(target: &Path, dst: &Path, skip_existing: bool) -> Result<bool, TaskError> {
    match symlink(target, dst) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if skip_existing {
                return Ok(false);
            }
            fs::remove_file(dst).at(dst)?;
            symlink(target, dst).at(dst)?;
            Ok(true)
        }
        Err(e) => Err(TaskError::io(dst, e)),
    }
}

/// Remove a non-directory entry.
#[inline]
pub fn unlink(path: &Path) -> Result<(), TaskError> {
    fs::remove_file(path).at(path)
}

/// Remove an empty directory.
#[inline]
pub fn remove_empty_dir(path: &Path) -> Result<(), TaskError> {
    fs::remove_dir(path).at(path)
}
