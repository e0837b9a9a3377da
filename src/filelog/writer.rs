//! Buffered file writer with flush throttling
//!
//! Owns the single open log file. Every method runs under the sink's
//! writer lock, so size accounting and rotation decisions never observe
//! a half-finished update.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::marker::timestamp_string;
use super::pending::PendingQueue;
use super::policy::{plan_rotation, prepare_directory, prune, RotationConfig};
use super::scanner::LogFileIndex;
use crate::common::{SinkCounters, SinkError, SinkResult};

/// Default minimum time between throttled flushes
pub const DEFAULT_MIN_FLUSH_PERIOD: Duration = Duration::from_secs(5);

const WRITE_BUFFER_CAPACITY: usize = 64 * 1024;

const BANNER_RULE: &str =
    "****************************************************************************";

/// Opens log files for appending
///
/// The seam exists so tests can inject failing writers.
pub trait OutputOpener: Send + Sync {
    fn open_append(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Opens real files, buffered
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOpener;

impl OutputOpener for DiskOpener {
    fn open_append(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Box::new(BufWriter::with_capacity(WRITE_BUFFER_CAPACITY, file)))
    }
}

/// Which banner to write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Opened,
    Closed,
}

impl std::fmt::Display for BannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BannerKind::Opened => write!(f, "Opened"),
            BannerKind::Closed => write!(f, "Closed"),
        }
    }
}

/// Render the open/close banner
pub fn banner(kind: BannerKind, leading_blank: bool, now: DateTime<Local>) -> String {
    format!(
        "{}{rule}\n                                Log File {}\n                              {}\n{rule}\n",
        if leading_blank { "\n" } else { "" },
        kind,
        timestamp_string(now),
        rule = BANNER_RULE,
    )
}

/// The file currently being written
struct ActiveFile {
    index: u64,
    path: PathBuf,
    out: Box<dyn Write + Send>,
    /// Budget left before rotation; negative means rotate on next write
    remaining: i64,
    /// Bytes written since the last flush
    dirty: bool,
}

/// Write/rotate/flush state, guarded by the sink's writer lock
pub(crate) struct FileWriter {
    config: Option<RotationConfig>,
    active: Option<ActiveFile>,
    opener: Arc<dyn OutputOpener>,
    min_flush_period: Duration,
    last_flush: Option<Instant>,
    counters: Arc<SinkCounters>,
}

impl FileWriter {
    pub(crate) fn new(
        opener: Arc<dyn OutputOpener>,
        min_flush_period: Duration,
        counters: Arc<SinkCounters>,
    ) -> Self {
        Self {
            config: None,
            active: None,
            opener,
            min_flush_period,
            last_flush: None,
            counters,
        }
    }

    pub(crate) fn set_opener(&mut self, opener: Arc<dyn OutputOpener>) {
        self.opener = opener;
    }

    pub(crate) fn set_config(&mut self, config: RotationConfig) {
        self.config = Some(config);
    }

    pub(crate) fn config(&self) -> Option<&RotationConfig> {
        self.config.as_ref()
    }

    pub(crate) fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    pub(crate) fn active_index(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.index)
    }

    pub(crate) fn remaining(&self) -> Option<i64> {
        self.active.as_ref().map(|a| a.remaining)
    }

    fn needs_rotation(&self) -> bool {
        match &self.active {
            None => true,
            Some(active) => active.remaining < 0,
        }
    }

    /// Close the active file (if any) and open the next one
    fn rotate(&mut self) -> SinkResult<()> {
        self.close_active()?;

        let config = self
            .config
            .as_ref()
            .ok_or_else(|| SinkError::invalid_config("log directory not configured"))?;
        let dir = config.directory();

        prepare_directory(dir)?;
        let index =
            LogFileIndex::scan(dir, config.prefix()).map_err(|e| SinkError::directory(dir, e))?;
        let plan = plan_rotation(config, &index);

        if !plan.prune.is_empty() {
            let report = prune(&plan.prune);
            self.counters.add_pruned(report.removed.len() as u64);
            for path in &report.removed {
                debug!(path = %path.display(), "Removed old log file");
            }
            for (path, e) in &report.failed {
                warn!(path = %path.display(), error = %e, "Failed to remove old log file");
            }
        }

        let mut out = self
            .opener
            .open_append(&plan.path)
            .map_err(|e| SinkError::open(&plan.path, e))?;
        out.write_all(banner(BannerKind::Opened, plan.reopen, Local::now()).as_bytes())?;

        info!(
            path = %plan.path.display(),
            index = plan.index,
            reopen = plan.reopen,
            "Opened log file"
        );

        self.active = Some(ActiveFile {
            index: plan.index,
            path: plan.path,
            out,
            remaining: config.size() as i64,
            dirty: true,
        });
        self.last_flush = None;
        self.counters.inc_rotations();
        Ok(())
    }

    /// Rotate if needed, then drain the pre-open queue into the file
    ///
    /// Records not yet handed to the file when a write fails go back to
    /// the front of the queue.
    pub(crate) fn ensure_ready(&mut self, pending: &PendingQueue) -> SinkResult<()> {
        if self.needs_rotation() {
            self.rotate()?;
        }

        let mut queued = pending.take_all();
        while let Some(record) = queued.pop_front() {
            if let Err(e) = self.write_str(&record) {
                pending.restore(queued);
                return Err(e);
            }
            self.counters.inc_written();
        }
        Ok(())
    }

    /// Append text to the active file, charging it against the budget
    fn write_str(&mut self, text: &str) -> SinkResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "no open log file",
            )));
        };
        active.remaining -= text.len() as i64;
        if let Err(e) = active.out.write_all(text.as_bytes()) {
            self.active = None;
            return Err(SinkError::Io(e));
        }
        active.dirty = true;
        self.counters.add_bytes(text.len() as u64);
        Ok(())
    }

    /// Write one formatted record, optionally preceded by a marker
    ///
    /// A marker forces a flush; otherwise the flush is throttled.
    pub(crate) fn write_record(
        &mut self,
        record: &str,
        marker: Option<&str>,
        pending: &PendingQueue,
    ) -> SinkResult<()> {
        self.ensure_ready(pending)?;
        if let Some(marker) = marker {
            self.write_str(marker)?;
        }
        self.write_str(record)?;
        self.counters.inc_written();

        if marker.is_some() {
            self.flush()
        } else {
            self.flush_if_due(Instant::now())
        }
    }

    /// Write a marker on its own and force a flush
    pub(crate) fn write_marker(&mut self, marker: &str, pending: &PendingQueue) -> SinkResult<()> {
        self.ensure_ready(pending)?;
        self.write_str(marker)?;
        self.flush()
    }

    /// Flush when data is buffered and the throttle period has passed
    pub(crate) fn flush_if_due(&mut self, now: Instant) -> SinkResult<()> {
        let dirty = self.active.as_ref().is_some_and(|a| a.dirty);
        let due = match self.last_flush {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.min_flush_period,
        };
        if dirty && due {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush unconditionally
    pub(crate) fn flush(&mut self) -> SinkResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if let Err(e) = active.out.flush() {
            self.active = None;
            return Err(SinkError::Io(e));
        }
        active.dirty = false;
        self.last_flush = Some(Instant::now());
        Ok(())
    }

    /// Write the closing banner, flush and release the active file
    ///
    /// The handle is released even when writing the banner fails.
    fn close_active(&mut self) -> SinkResult<()> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };
        active
            .out
            .write_all(banner(BannerKind::Closed, true, Local::now()).as_bytes())?;
        active.out.flush()?;
        debug!(
            path = %active.path.display(),
            overrun = active.remaining.min(0).unsigned_abs(),
            "Closed log file"
        );
        Ok(())
    }

    /// Final close: drain anything still queued, then close the file
    pub(crate) fn finish(&mut self, pending: &PendingQueue) -> SinkResult<()> {
        if !pending.is_empty() {
            self.ensure_ready(pending)?;
        }
        self.close_active()
    }

    /// Drop the active handle without writing anything more
    pub(crate) fn discard(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(path = %active.path.display(), "Discarded log file handle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn writer_for(tmp: &TempDir, count: i32, size: u64) -> FileWriter {
        let mut writer = FileWriter::new(
            Arc::new(DiskOpener),
            DEFAULT_MIN_FLUSH_PERIOD,
            Arc::new(SinkCounters::new()),
        );
        writer.set_config(RotationConfig::new(tmp.path(), "log", count, size).unwrap());
        writer
    }

    fn read(tmp: &TempDir, name: &str) -> String {
        fs::read_to_string(tmp.path().join(name)).unwrap()
    }

    #[test]
    fn test_banner_layout() {
        use chrono::TimeZone;
        let t = Local.with_ymd_and_hms(2017, 6, 1, 14, 30, 0).unwrap();
        let text = banner(BannerKind::Opened, false, t);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].chars().all(|c| c == '*'));
        assert_eq!(lines[1], "                                Log File Opened");
        assert_eq!(lines[2], "                              14:30 (01 Jun 2017)");
        assert_eq!(lines[3], lines[0]);

        let closed = banner(BannerKind::Closed, true, t);
        assert!(closed.starts_with("\n*"));
        assert!(closed.contains("Log File Closed"));
    }

    #[test]
    fn test_first_write_opens_index_zero() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        let mut writer = writer_for(&tmp, 10, 1000);

        writer.write_record("hello\n", None, &pending).unwrap();
        assert_eq!(writer.active_index(), Some(0));
        assert_eq!(writer.remaining(), Some(994));

        let text = read(&tmp, "log.0");
        assert!(text.starts_with(BANNER_RULE));
        assert!(text.ends_with("hello\n"));
    }

    #[test]
    fn test_rotation_after_budget_exhausted() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        let mut writer = writer_for(&tmp, -1, 10);

        writer.write_record("0123456789ab\n", None, &pending).unwrap();
        assert!(writer.remaining().unwrap() < 0);
        assert_eq!(writer.active_index(), Some(0));

        writer.write_record("next\n", None, &pending).unwrap();
        assert_eq!(writer.active_index(), Some(1));

        let first = read(&tmp, "log.0");
        assert!(first.contains("Log File Closed"));
        let second = read(&tmp, "log.1");
        assert!(second.ends_with("next\n"));
    }

    #[test]
    fn test_drains_pending_before_record() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        pending.push_while("early-1\n".into(), || true).unwrap();
        pending.push_while("early-2\n".into(), || true).unwrap();

        let mut writer = writer_for(&tmp, 10, 1000);
        writer.write_record("late\n", None, &pending).unwrap();
        assert!(pending.is_empty());

        let text = read(&tmp, "log.0");
        let a = text.find("early-1").unwrap();
        let b = text.find("early-2").unwrap();
        let c = text.find("late").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_marker_precedes_record() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        let mut writer = writer_for(&tmp, 10, 1000);

        writer
            .write_record("rec\n", Some("\nMARK\n\n"), &pending)
            .unwrap();
        let text = read(&tmp, "log.0");
        assert!(text.ends_with("\nMARK\n\nrec\n"));
    }

    #[test]
    fn test_reopen_continues_small_file() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        {
            let mut writer = writer_for(&tmp, 10, 100_000);
            writer.write_record("first\n", None, &pending).unwrap();
            writer.finish(&pending).unwrap();
        }
        let mut writer = writer_for(&tmp, 10, 100_000);
        writer.write_record("second\n", None, &pending).unwrap();
        assert_eq!(writer.active_index(), Some(0));
        writer.finish(&pending).unwrap();

        let text = read(&tmp, "log.0");
        assert_eq!(text.matches("Log File Opened").count(), 2);
        assert!(text.contains("Log File Closed\n"));
        assert!(text.find("first").unwrap() < text.find("second").unwrap());
    }

    #[test]
    fn test_throttled_flush() {
        let tmp = TempDir::new().unwrap();
        let pending = PendingQueue::new();
        let mut writer = FileWriter::new(
            Arc::new(DiskOpener),
            Duration::from_secs(3600),
            Arc::new(SinkCounters::new()),
        );
        writer.set_config(RotationConfig::new(tmp.path(), "log", 10, 100_000).unwrap());

        // First write after open flushes
        writer.write_record("one\n", None, &pending).unwrap();
        assert!(read(&tmp, "log.0").ends_with("one\n"));

        // Within the throttle period data stays buffered
        writer.write_record("two\n", None, &pending).unwrap();
        assert!(!read(&tmp, "log.0").contains("two"));

        writer.flush().unwrap();
        assert!(read(&tmp, "log.0").ends_with("two\n"));
    }

    #[test]
    fn test_rotate_fails_on_file_target() {
        let tmp = TempDir::new().unwrap();
        let not_dir = tmp.path().join("plain");
        fs::write(&not_dir, b"x").unwrap();

        let pending = PendingQueue::new();
        let mut writer = FileWriter::new(
            Arc::new(DiskOpener),
            DEFAULT_MIN_FLUSH_PERIOD,
            Arc::new(SinkCounters::new()),
        );
        writer.set_config(RotationConfig::new(&not_dir, "log", 10, 100).unwrap());

        let err = writer.write_record("x\n", None, &pending).unwrap_err();
        assert!(matches!(err, SinkError::NotADirectory(_)));
        assert!(writer.active_path().is_none());
    }
}
