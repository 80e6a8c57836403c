//! Destination path resolution.
//!
//! Maps a path visited under `source_root/entry` to the matching position under
//! `dest_root/(rename or entry)`, so a renamed top-level entry carries its whole
//! subtree along.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Compute where `current` lands in the destination tree.
///
/// Returns `None` if `current` does not live under `source_root/entry`.
pub fn resolve_destination(
    current: &Path,
    source_root: &Path,
    dest_root: &Path,
    entry: &OsStr,
    rename: Option<&OsStr>,
) -> Option<PathBuf> {
    let top = source_root.join(entry);
    let rest = current.strip_prefix(&top).ok()?;

    let mut out = dest_root.join(rename.unwrap_or(entry));
    if !rest.as_os_str().is_empty() {
        out.push(rest);
    }
    Some(out)
}

/// Target for a copied symlink in the default (non-raw) mode.
///
/// Relative targets are made absolute from the link's own directory. If the result
/// points inside the top-level source entry it is remapped into the destination tree,
/// otherwise it keeps pointing at the original object.
pub fn rewrite_link_target(
    link: &Path,
    target: &Path,
    source_root: &Path,
    dest_root: &Path,
    entry: &OsStr,
    rename: Option<&OsStr>,
) -> PathBuf {
    let absolute = if target.is_absolute() {
        normalize(target)
    } else {
        let base = link.parent().unwrap_or_else(|| Path::new("/"));
        normalize(&base.join(target))
    };

    resolve_destination(&absolute, source_root, dest_root, entry, rename).unwrap_or(absolute)
}

/// Lexically clean `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(comp);
                }
            }
            other => out.push(other),
        }
    }
    out
}
