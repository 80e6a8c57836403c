//! Helpers for burrow.
//!
//! - Color parsing from strings or hex codes
//! - Displaying home directories as "~" in file paths
//! - Clamping configuration values to safe ranges
//! - Parsing octal modes and numeric ids from the command line
//! - Splitting a path into its parent directory and entry name

use ratatui::style::Color;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Parses a string (color name or hex) into a ratatui::style::color
///
/// Supports standard names (red, green, etc.) as well as hex values (#RRGGBB or #RGB)
pub fn parse_color(s: &str) -> Color {
    match s.to_lowercase().as_str() {
        "default" | "reset" => Color::Reset,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "black" => Color::Black,
        "gray" => Color::Gray,
        "darkgray" => Color::DarkGray,
        _ => {
            let Some(hex) = s.strip_prefix('#') else {
                return Color::Reset;
            };
            let expanded = match hex.len() {
                6 => hex.to_string(),
                3 => hex.chars().flat_map(|c| [c, c]).collect(),
                _ => return Color::Reset,
            };
            match u32::from_str_radix(&expanded, 16) {
                Ok(rgb) => Color::Rgb(
                    ((rgb >> 16) & 0xFF) as u8,
                    ((rgb >> 8) & 0xFF) as u8,
                    (rgb & 0xFF) as u8,
                ),
                Err(_) => Color::Reset,
            }
        }
    }
}

pub fn get_home() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Util function to shorten home directory to ~.
/// Used by the progress panel for the source and destination lines.
pub fn shorten_home_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if let Some(home_dir) = get_home()
        && let Ok(stripped) = path.strip_prefix(&home_dir)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~{}{}", MAIN_SEPARATOR, stripped.display());
    }
    path.display().to_string()
}

/// Clamp a configuration value, warning if it had to move.
pub fn clamp_setting<T: Ord + Copy + Display>(name: &str, value: T, min: T, max: T) -> T {
    let clamped = value.clamp(min, max);
    if clamped != value {
        eprintln!(
            "[Warning] {}={} out of range ({}..={}), clamped to {}",
            name, value, min, max, clamped
        );
    }
    clamped
}

/// Parse an octal permission mask such as "755" or "0o4000".
pub fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("invalid mode '{}'", s))?;
    if mode > 0o7777 {
        return Err(format!("mode '{}' out of range", s));
    }
    Ok(mode)
}

/// Parse a numeric user or group id.
pub fn parse_id(s: &str) -> Result<u32, String> {
    s.parse::<u32>().map_err(|_| format!("invalid id '{}'", s))
}

/// Split a command line path into its absolute parent directory and entry name.
///
/// Returns `None` for paths without a final name, like "/" or "..".
pub fn split_entry(path: &Path) -> Option<(PathBuf, OsString)> {
    let abs = std::path::absolute(path).ok()?;
    let name = abs.file_name()?.to_os_string();
    let parent = abs.parent()?.to_path_buf();
    Some((parent, name))
}

/// Helper utils tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("Cyan"), Color::Cyan);
        assert_eq!(parse_color("#ff8000"), Color::Rgb(255, 128, 0));
        assert_eq!(parse_color("#f80"), Color::Rgb(255, 136, 0));
        assert_eq!(parse_color("#zzzzzz"), Color::Reset);
        assert_eq!(parse_color("chartreuse"), Color::Reset);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("755"), Ok(0o755));
        assert_eq!(parse_mode("0o4000"), Ok(0o4000));
        assert!(parse_mode("9").is_err());
        assert!(parse_mode("17777").is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1000"), Ok(1000));
        assert!(parse_id("-1").is_err());
    }

    #[test]
    fn test_split_entry() {
        let (parent, name) = split_entry(Path::new("/var/log/syslog")).unwrap();
        assert_eq!(parent, PathBuf::from("/var/log"));
        assert_eq!(name, OsString::from("syslog"));
        assert!(split_entry(Path::new("/")).is_none());
    }

    #[test]
    fn test_clamp_setting() {
        assert_eq!(clamp_setting("x", 5usize, 1, 10), 5);
        assert_eq!(clamp_setting("x", 0usize, 1, 10), 1);
        assert_eq!(clamp_setting("x", 99u64, 1, 10), 10);
    }
}
