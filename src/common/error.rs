//! Error types for the file log sink
//!
//! # Design Principles (KISS)
//! - Lifecycle misuse and startup failures are returned to the caller
//! - Runtime I/O failures never reach producers; they are latched instead
//! - Use thiserror for ergonomic error handling

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the rotating file sink
///
/// Only `configure` (and `NodeLogger::set_log_dir`) hand these to callers.
/// Failures during `publish`/`flush`/`close` are converted to a message,
/// latched, and reported once through the diagnostic channel.
#[derive(Error, Debug)]
pub enum SinkError {
    /// `configure` called on a sink that has already been configured
    #[error("Log directory should not be set more than once")]
    AlreadyConfigured,

    /// `configure` called after `close`
    #[error("Log sink is closed")]
    Closed,

    /// Rotation parameters rejected before any state change
    #[error("Invalid rotation config: {0}")]
    InvalidConfig(String),

    /// Target path exists but is not a directory
    #[error("Log directory is not a directory, {}", .0.display())]
    NotADirectory(PathBuf),

    /// Target directory could not be created or listed
    #[error("Unable to prepare log directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be opened for appending
    #[error("Unable to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write, flush or close failure on the active file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub(crate) fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Directory {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using SinkError
pub type SinkResult<T> = Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_configured_error() {
        let err = SinkError::AlreadyConfigured;
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_config_error() {
        let err = SinkError::invalid_config("prefix must not be empty");
        assert!(err.to_string().contains("Invalid rotation config"));
        assert!(err.to_string().contains("prefix must not be empty"));
    }

    #[test]
    fn test_not_a_directory_error() {
        let err = SinkError::NotADirectory(PathBuf::from("/tmp/some-file"));
        assert!(err.to_string().contains("/tmp/some-file"));
    }

    #[test]
    fn test_open_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SinkError::open("/var/log/twinelog.0", io_err);
        assert!(err.to_string().contains("twinelog.0"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SinkError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
