//! The main config loading module for burrow.
//!
//! Handles loading and deserializing settings from `burrow.toml`.
//!
//! Provides the main [Config] struct, as well as the internal [RawConfig] used for parsing.
//! Also implements default config generation for `bw --init`.

use crate::config::{Behavior, Tasks, Theme};
use crate::utils::get_home;

use serde::Deserialize;
use std::{fs, io, path::Path, path::PathBuf};

/// Raw configuration as read from the toml file.
/// Values are clamped and converted into the main [Config] struct.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct RawConfig {
    tasks: Tasks,
    behavior: Behavior,
    theme: Theme,
}

/// Main configuration struct for burrow.
#[derive(Debug, Default)]
pub struct Config {
    tasks: Tasks,
    behavior: Behavior,
    theme: Theme,
}

/// Conversion from RawConfig to Config
/// Out-of-range task settings are clamped here.
impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            tasks: raw.tasks.clamped(),
            behavior: raw.behavior,
            theme: raw.theme,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    /// If the file does not exist or fails to parse, returns the default configuration.
    pub fn load() -> Self {
        let path = Self::default_path();

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error parsing config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse the config at `path`.
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> io::Result<Self> {
        toml::from_str::<RawConfig>(content)
            .map(Config::from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }

    // Getters

    #[inline]
    pub fn tasks(&self) -> &Tasks {
        &self.tasks
    }

    #[inline]
    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    #[inline]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Determine the default configuration file path.
    /// Checks the BW_CONFIG environment variable first,
    /// Checks for XDG_CONFIG_HOME after,
    /// then defaults to ~/.config/burrow/burrow.toml,
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("BW_CONFIG") {
            return PathBuf::from(path);
        }

        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("burrow/burrow.toml");
        }

        if let Some(home) = get_home() {
            return home.join(".config/burrow/burrow.toml");
        }
        PathBuf::from("burrow.toml")
    }

    /// Generate a default configuration file at the specified path.
    /// If the file already exists, returns an error.
    pub fn generate_default(path: &Path) -> io::Result<()> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {:?}", path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_TOML)?;
        println!("Default config generated at {:?}", path);
        Ok(())
    }
}

const DEFAULT_TOML: &str = r##"# burrow.toml - default configuration for burrow

# Note:
# Commented values are the internal defaults of burrow.
# Use hex codes (eg. "#RRGGBB") or terminal colors ("cyan")

[tasks]
# Work units (entries visited or buffers copied) per screen refresh
# budget = 256
# Copy chunk size in bytes
# buffer_size = 65536
# Input poll interval between refreshes, in milliseconds
# tick_ms = 16

[behavior]
# Follow symlinks when copying
# dereference = false
# Copy link targets verbatim instead of re-pointing them
# raw_links = false
# Leave symlinks alone entirely
# skip_links = false
# What to do when destinations already exist: "ask", "skip", "overwrite" or "abort"
# conflicts = "ask"

[theme]
# accent = "cyan"
# gauge = "green"
# error = "red"
"##;
