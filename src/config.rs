//! Configuration management for foldterm.
//!
//! Settings are read from `~/.foldterm/config.toml`:
//!
//! ```toml
//! [terminal]
//! width = 120
//! height = 40
//! tab_size = 8
//! auto_wrap = true
//! # Entries kept in each SGR/CSI decode cache
//! cache_capacity = 1024
//!
//! [logging]
//! # Filter used when RUST_LOG is not set
//! level = "debug"
//! # Log to a file instead of stderr
//! file = "/tmp/foldterm.log"
//! ```
//!
//! Every field is optional. Command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::session::SessionOptions;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal geometry and behaviour
    pub terminal: TerminalConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Terminal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub width: usize,
    pub height: usize,
    pub tab_size: usize,
    pub auto_wrap: bool,
    pub cache_capacity: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            tab_size: 8,
            auto_wrap: true,
            cache_capacity: 1024,
        }
    }
}

impl From<&TerminalConfig> for SessionOptions {
    fn from(config: &TerminalConfig) -> Self {
        SessionOptions {
            width: config.width,
            height: config.height,
            tab_size: config.tab_size,
            auto_wrap: config.auto_wrap,
            cache_capacity: config.cache_capacity,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location. A missing file
    /// yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".foldterm").join("config.toml"))
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
