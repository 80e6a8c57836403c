//! Display formatting for task progress.
//!
//! Sizes, permission strings and width-exact path truncation used by the progress panel
//! and the final summary line.

use humansize::{DECIMAL, format_size};
use unicode_width::UnicodeWidthChar;

use std::path::Path;

/// Human-readable byte count, e.g. "1.20 MB".
pub fn format_bytes(size: u64) -> String {
    format_size(size, DECIMAL)
}

/// "done / total" for byte counters.
pub fn format_bytes_ratio(done: u64, total: u64) -> String {
    format!("{} / {}", format_bytes(done), format_bytes(total))
}

/// Formats permission bits in the unix 'rwxr-xr-x' style, including setuid/setgid/sticky.
pub fn format_mode(mode: u32) -> String {
    let mut chars = ['-'; 9];
    let shifts = [6, 3, 0];
    for (i, &shift) in shifts.iter().enumerate() {
        let base = i * 3;
        if (mode >> (shift + 2)) & 1 != 0 {
            chars[base] = 'r';
        }
        if (mode >> (shift + 1)) & 1 != 0 {
            chars[base + 1] = 'w';
        }
        if (mode >> shift) & 1 != 0 {
            chars[base + 2] = 'x';
        }
    }
    let special = [(0o4000, 2, 's', 'S'), (0o2000, 5, 's', 'S'), (0o1000, 8, 't', 'T')];
    for (bit, idx, exec, plain) in special {
        if mode & bit != 0 {
            chars[idx] = if chars[idx] == 'x' { exec } else { plain };
        }
    }
    chars.iter().collect()
}

/// Describes a relative permission change like "+rwx -w" for the progress title.
pub fn format_mode_change(set: u32, clear: u32) -> String {
    let mut parts = Vec::new();
    if set != 0 {
        parts.push(format!("+{:04o}", set));
    }
    if clear != 0 {
        parts.push(format!("-{:04o}", clear));
    }
    parts.join(" ")
}

/// Fits a path into `width` terminal cells, keeping its tail.
///
/// Control characters are dropped; a leading '…' marks truncation.
pub fn fit_path(path: &Path, width: usize) -> String {
    let full = path.to_string_lossy();
    let chars: Vec<char> = full.chars().filter(|c| !c.is_control()).collect();
    let total: usize = chars.iter().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        return chars.into_iter().collect();
    }
    if width == 0 {
        return String::new();
    }

    // Walk from the end until the tail plus the ellipsis fills the width.
    let budget = width - 1;
    let mut used = 0;
    let mut start = chars.len();
    for (i, c) in chars.iter().enumerate().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        start = i;
    }
    let mut out = String::with_capacity(width * 2);
    out.push('…');
    out.extend(&chars[start..]);
    out
}
