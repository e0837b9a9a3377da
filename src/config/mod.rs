//! Configuration for the Twine node shell
//!
//! Loaded from a TOML file; every field has a default so an empty file
//! (or none at all) is a valid configuration.
//!
//! # Example
//! ```ignore
//! let config = Config::load("twinenode.toml")?;
//! let rotation = config.log.rotation_config(&config.node.root_dir())?;
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::filelog::{RotationConfig, SinkOptions};
use crate::logger::{DEFAULT_LOG_COUNT, DEFAULT_LOG_SIZE, LOG_PREFIX};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

// =============================================================================
// Node
// =============================================================================

/// Node-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
    /// Root directory for node data
    #[serde(default = "default_root_dir")]
    pub root_dir: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
        }
    }
}

impl NodeSection {
    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(&self.root_dir)
    }
}

fn default_root_dir() -> String {
    ".".to_string()
}

// =============================================================================
// Log files
// =============================================================================

/// Rotating file log settings
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    /// Log directory; defaults to `<root_dir>/logs`
    #[serde(default)]
    pub directory: Option<String>,

    /// File name stem, files are named `<prefix>.<index>`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Target number of log files to keep (negative = unlimited)
    #[serde(default = "default_count")]
    pub count: i32,

    /// Target size of log files in bytes
    #[serde(default = "default_size")]
    pub size: u64,

    /// Minimum seconds between throttled flushes
    #[serde(default = "default_min_flush_secs")]
    pub min_flush_secs: u64,

    /// Seconds between timestamp markers (0 = disabled)
    #[serde(default = "default_marker_secs")]
    pub marker_secs: u64,

    /// Level filter for the log file
    #[serde(default = "default_file_level")]
    pub file_level: String,

    /// Level filter for the console
    #[serde(default = "default_console_level")]
    pub console_level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            directory: None,
            prefix: default_prefix(),
            count: default_count(),
            size: default_size(),
            min_flush_secs: default_min_flush_secs(),
            marker_secs: default_marker_secs(),
            file_level: default_file_level(),
            console_level: default_console_level(),
        }
    }
}

fn default_prefix() -> String {
    LOG_PREFIX.to_string()
}
fn default_count() -> i32 {
    DEFAULT_LOG_COUNT
}
fn default_size() -> u64 {
    DEFAULT_LOG_SIZE
}
fn default_min_flush_secs() -> u64 {
    5
}
fn default_marker_secs() -> u64 {
    60
}
fn default_file_level() -> String {
    "debug".to_string()
}
fn default_console_level() -> String {
    "info".to_string()
}

impl LogSection {
    /// Effective log directory for a node root
    pub fn log_dir(&self, root: &Path) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(dir),
            None => root.join("logs"),
        }
    }

    /// Validated rotation parameters
    pub fn rotation_config(&self, root: &Path) -> Result<RotationConfig, ConfigError> {
        RotationConfig::new(self.log_dir(root), self.prefix.clone(), self.count, self.size)
            .map_err(|e| ConfigError::invalid("log", e.to_string()))
    }

    /// Sink timing derived from this section
    pub fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            min_flush_period: Duration::from_secs(self.min_flush_secs),
            marker_period: (self.marker_secs > 0).then(|| Duration::from_secs(self.marker_secs)),
        }
    }

    pub fn file_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_level("log.file_level", &self.file_level)
    }

    pub fn console_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_level("log.console_level", &self.console_level)
    }
}

fn parse_level(field: &str, value: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(value).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
