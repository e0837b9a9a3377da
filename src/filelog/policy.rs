//! Rotation and retention policy
//!
//! Given a fresh [`LogFileIndex`], decide which file to write next and
//! which old files to delete.
//!
//! - Next file: the newest file is reopened (append) while it is smaller
//!   than `REOPEN_NUMERATOR / REOPEN_DENOMINATOR` of the size budget,
//!   otherwise a new file with the next index is created. This keeps a
//!   restart loop from leaving behind many tiny files.
//! - Retention: the files other than the chosen target share a budget of
//!   `(count - ACTIVE_SLOTS) * size` bytes, newest first. The first file
//!   that overruns the budget and everything older is deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::scanner::{log_file_name, LogFileEntry, LogFileIndex};
use crate::common::{SinkError, SinkResult};

/// Reopen threshold, numerator
pub const REOPEN_NUMERATOR: u64 = 3;
/// Reopen threshold, denominator
pub const REOPEN_DENOMINATOR: u64 = 4;
/// Retention slots reserved for the file being written
pub const ACTIVE_SLOTS: i64 = 1;

/// Immutable rotation parameters, set once per sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    directory: PathBuf,
    prefix: String,
    count: i32,
    size: u64,
}

impl RotationConfig {
    /// Validate and build a rotation config
    ///
    /// * `count` - files to retain; negative disables retention
    /// * `size` - per-file byte budget before rotation
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        count: i32,
        size: u64,
    ) -> SinkResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(SinkError::invalid_config("prefix must not be empty"));
        }
        if prefix.contains(['/', '\\']) {
            return Err(SinkError::invalid_config(format!(
                "prefix must not contain path separators: {}",
                prefix
            )));
        }
        if size == 0 {
            return Err(SinkError::invalid_config("size must be greater than zero"));
        }
        if size > i64::MAX as u64 {
            return Err(SinkError::invalid_config(format!("size too large: {}", size)));
        }
        Ok(Self {
            directory: directory.into(),
            prefix,
            count,
            size,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Files below this size are reopened instead of starting a new one
    pub fn reopen_threshold(&self) -> u64 {
        (self.size as u128 * REOPEN_NUMERATOR as u128 / REOPEN_DENOMINATOR as u128) as u64
    }

    /// Byte budget shared by the retained non-active files, if retention is on
    pub fn retention_budget(&self) -> Option<i128> {
        if self.count < 0 {
            return None;
        }
        Some((self.count as i128 - ACTIVE_SLOTS as i128) * self.size as i128)
    }

    /// Path of the file with the given rotation index
    pub fn file_path(&self, index: u64) -> PathBuf {
        self.directory.join(log_file_name(&self.prefix, index))
    }
}

/// Outcome of a rotation decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan {
    /// Index of the file to write next
    pub index: u64,
    pub path: PathBuf,
    /// True when continuing an existing file
    pub reopen: bool,
    /// Files to delete, newest first
    pub prune: Vec<LogFileEntry>,
}

/// Decide the next file and the retention victims for a scan snapshot
pub fn plan_rotation(config: &RotationConfig, index: &LogFileIndex) -> RotationPlan {
    let (next, reopen) = match index.newest() {
        None => (0, false),
        Some(top) if top.size < config.reopen_threshold() => (top.index, true),
        Some(top) => (top.index + 1, false),
    };

    let mut prune = Vec::new();
    if let Some(mut budget) = config.retention_budget() {
        let mut over = false;
        for entry in index.newest_first().filter(|e| e.index != next) {
            if !over {
                budget -= entry.size as i128;
                over = budget < 0;
            }
            if over {
                prune.push(entry.clone());
            }
        }
    }

    RotationPlan {
        index: next,
        path: config.file_path(next),
        reopen,
        prune,
    }
}

/// Make sure the target directory exists and is a directory
pub fn prepare_directory(dir: &Path) -> SinkResult<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(SinkError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|e| SinkError::directory(dir, e))?;
    if !dir.is_dir() {
        return Err(SinkError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Result of deleting retention victims
#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

/// Delete the files selected by a plan
///
/// Files that vanished in the meantime count as removed.
pub fn prune(victims: &[LogFileEntry]) -> PruneReport {
    let mut report = PruneReport::default();
    for entry in victims {
        match fs::remove_file(&entry.path) {
            Ok(()) => report.removed.push(entry.path.clone()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                report.removed.push(entry.path.clone())
            }
            Err(e) => report.failed.push((entry.path.clone(), e)),
        }
    }
    report
}
