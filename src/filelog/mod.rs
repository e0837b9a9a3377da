//! Rotating file log sink
//!
//! Architecture (single writer, many producers):
//! - Lifecycle: atomic `Initial → Opened → Closed` cell, compare-and-set only
//! - Pre-open queue: records published before `configure` wait here
//! - Writer lock: one mutex covers write + flush + rotation
//! - Error latch: first I/O failure is reported once, later records dropped
//!
//! File naming: `<prefix>.<index>`
//!   - index: non-negative integer chosen by the rotation policy
//!
//! Publishes racing with `close`:
//! - observed `Closed` before taking the writer lock → dropped
//! - holding the writer lock when `close` transitions → written before the
//!   closing banner
//! - acquiring the writer lock after `close` → state re-checked, dropped

pub mod latch;
pub mod layer;
pub mod marker;
pub mod pending;
pub mod policy;
pub mod record;
pub mod scanner;
pub mod state;
pub mod writer;

pub use latch::{DiagnosticSink, ErrorLatch, TracingDiagnostics};
pub use layer::FileSinkLayer;
pub use marker::{spawn_marker_task, PeriodicMarker, DEFAULT_MARKER_PERIOD};
pub use pending::PendingQueue;
pub use policy::{plan_rotation, RotationConfig, RotationPlan};
pub use record::{LevelFormatter, LogRecord, RecordFormatter};
pub use scanner::{LogFileEntry, LogFileIndex};
pub use state::{LifecycleCell, SinkState};
pub use writer::{DiskOpener, OutputOpener, DEFAULT_MIN_FLUSH_PERIOD};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::common::{SinkCounters, SinkError, SinkResult, SinkStats};
use marker::marker_text;
use policy::prepare_directory;
use writer::FileWriter;

/// Target prefix of every event emitted from this module tree
pub(crate) const SINK_TARGET: &str = module_path!();

/// Timing knobs for the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    /// Minimum time between throttled flushes
    pub min_flush_period: Duration,
    /// Timestamp marker cadence; `None` disables markers
    pub marker_period: Option<Duration>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            min_flush_period: DEFAULT_MIN_FLUSH_PERIOD,
            marker_period: Some(DEFAULT_MARKER_PERIOD),
        }
    }
}

/// Concurrent, rotating, retention-aware log file sink
///
/// Construct once, share through `Arc` with every producer.
pub struct RotatingFileSink {
    state: LifecycleCell,
    writer: Mutex<FileWriter>,
    pending: PendingQueue,
    marker: PeriodicMarker,
    latch: ErrorLatch,
    formatter: Box<dyn RecordFormatter>,
    diagnostics: Arc<dyn DiagnosticSink>,
    counters: Arc<SinkCounters>,
    options: SinkOptions,
}

impl RotatingFileSink {
    /// Create an unconfigured sink writing real files
    pub fn new(options: SinkOptions) -> Self {
        let counters = Arc::new(SinkCounters::new());
        Self {
            state: LifecycleCell::new(),
            writer: Mutex::new(FileWriter::new(
                Arc::new(DiskOpener),
                options.min_flush_period,
                counters.clone(),
            )),
            pending: PendingQueue::new(),
            marker: PeriodicMarker::new(options.marker_period),
            latch: ErrorLatch::new(),
            formatter: Box::new(LevelFormatter),
            diagnostics: Arc::new(TracingDiagnostics),
            counters,
            options,
        }
    }

    /// Replace the record formatter
    pub fn with_formatter(mut self, formatter: impl RecordFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Replace the diagnostic channel
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replace how log files are opened
    pub fn with_opener(mut self, opener: Arc<dyn OutputOpener>) -> Self {
        self.writer.get_mut().set_opener(opener);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> SinkState {
        self.state.get()
    }

    pub fn options(&self) -> SinkOptions {
        self.options
    }

    /// Snapshot of the sink counters
    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    /// Message of the latched failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.latch.message()
    }

    /// Path of the file currently open for writing
    pub fn active_path(&self) -> Option<PathBuf> {
        self.writer.lock().active_path().map(|p| p.to_path_buf())
    }

    /// Rotation parameters, once configured
    pub fn config(&self) -> Option<RotationConfig> {
        self.writer.lock().config().cloned()
    }

    /// Records waiting for the first open
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Set the log directory and open the first file
    ///
    /// Moves `Initial → Opened` exactly once. Directory problems are
    /// reported before the transition, leaving the sink unconfigured.
    /// An open failure after the transition is latched and returned so
    /// the owner can treat it as fatal.
    pub fn configure(&self, config: RotationConfig) -> SinkResult<()> {
        let mut writer = self.writer.lock();
        match self.state.get() {
            SinkState::Initial => {}
            SinkState::Opened => return Err(SinkError::AlreadyConfigured),
            SinkState::Closed => return Err(SinkError::Closed),
        }

        prepare_directory(config.directory())?;

        let transition = self
            .pending
            .gate(|| self.state.transition(SinkState::Initial, SinkState::Opened));
        if let Err(observed) = transition {
            return Err(match observed {
                SinkState::Closed => SinkError::Closed,
                _ => SinkError::AlreadyConfigured,
            });
        }

        info!(
            directory = %config.directory().display(),
            prefix = config.prefix(),
            count = config.count(),
            size = config.size(),
            queued = self.pending.len(),
            "Log directory configured"
        );
        writer.set_config(config);

        let result = writer.ensure_ready(&self.pending);
        let result = result.and_then(|()| writer.flush());
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let report = self.latch.trip(e.to_string());
                drop(writer);
                self.report(report);
                Err(e)
            }
        }
    }

    /// Format and route a record according to the lifecycle state
    ///
    /// Never blocks on anything but the writer lock and never fails.
    pub fn publish(&self, record: &LogRecord) {
        if self.state.get() == SinkState::Closed || self.latch.is_set() {
            self.counters.inc_dropped();
            return;
        }
        let text = self.formatter.format(record);
        self.publish_formatted(text);
    }

    /// Route already-formatted text, bypassing the formatter
    pub fn publish_formatted(&self, text: String) {
        if self.state.get() == SinkState::Closed || self.latch.is_set() {
            self.counters.inc_dropped();
            return;
        }
        let marker = match self.state.get() {
            SinkState::Initial => self.claim_marker(),
            _ => None,
        };

        if let Some((marker, text)) = self.enqueue(marker, text) {
            self.write_through(&text, marker);
        }
    }

    /// Marker text if one is due
    fn claim_marker(&self) -> Option<String> {
        self.marker
            .claim(Instant::now())
            .then(|| marker_text(Local::now()))
    }

    /// Queue while `Initial`; hand back whatever could not be queued
    fn enqueue(&self, marker: Option<String>, text: String) -> Option<(Option<String>, String)> {
        let initial = || self.state.get() == SinkState::Initial;

        if let Some(marker) = marker {
            if let Err(marker) = self.pending.push_while(marker, initial) {
                return Some((Some(marker), text));
            }
        }
        match self.pending.push_while(text, initial) {
            Ok(()) => {
                self.counters.inc_queued();
                None
            }
            Err(text) => Some((None, text)),
        }
    }

    /// Write under the lock; the marker is claimed only once the record is
    /// known to reach the file
    fn write_through(&self, text: &str, marker: Option<String>) {
        let mut writer = self.writer.lock();
        if self.state.get() != SinkState::Opened || self.latch.is_set() {
            drop(writer);
            self.counters.inc_dropped();
            return;
        }
        let marker = marker.or_else(|| self.claim_marker());
        let result = writer.write_record(text, marker.as_deref(), &self.pending);
        let report = self.latch_failure(result);
        drop(writer);
        self.report(report);
    }

    /// Flush buffered data now; no-op outside `Opened`
    pub fn flush(&self) {
        if self.state.get() != SinkState::Opened {
            return;
        }
        let mut writer = self.writer.lock();
        if self.state.get() != SinkState::Opened || self.latch.is_set() {
            return;
        }
        let result = writer.flush();
        let report = self.latch_failure(result);
        drop(writer);
        self.report(report);
    }

    /// Periodic housekeeping: due marker, else due throttled flush
    pub fn tick(&self) {
        if self.state.get() != SinkState::Opened || self.latch.is_set() {
            return;
        }
        let now = Instant::now();
        let mut writer = self.writer.lock();
        if self.state.get() != SinkState::Opened || self.latch.is_set() {
            return;
        }
        let result = if self.marker.claim(now) {
            writer.write_marker(&marker_text(Local::now()), &self.pending)
        } else {
            writer.flush_if_due(now)
        };
        let report = self.latch_failure(result);
        drop(writer);
        self.report(report);
    }

    /// Close the sink; idempotent
    ///
    /// From `Initial` nothing touches the disk and queued records are
    /// discarded. From `Opened` the transition winner writes the closing
    /// banner, flushes and releases the file.
    pub fn close(&self) {
        loop {
            match self.state.get() {
                SinkState::Initial => {
                    let closed = self
                        .pending
                        .gate(|| self.state.transition(SinkState::Initial, SinkState::Closed));
                    if closed.is_ok() {
                        let discarded = self.pending.clear();
                        debug!(discarded, "Log sink closed before configuration");
                        return;
                    }
                }
                SinkState::Opened => {
                    if self
                        .state
                        .transition(SinkState::Opened, SinkState::Closed)
                        .is_ok()
                    {
                        self.finish();
                        return;
                    }
                }
                SinkState::Closed => return,
            }
        }
    }

    fn finish(&self) {
        let mut writer = self.writer.lock();
        let report = if self.latch.is_set() {
            writer.discard();
            None
        } else {
            let result = writer.finish(&self.pending);
            if result.is_err() {
                writer.discard();
            }
            self.latch_failure(result)
        };
        drop(writer);
        self.report(report);

        let stats = self.counters.snapshot();
        info!(
            written = stats.written,
            dropped = stats.dropped,
            rotations = stats.rotations,
            bytes = %stats.format_bytes(),
            "Log sink closed"
        );
    }

    /// Clear a latched failure so the next write reopens a file
    ///
    /// Records still in the pre-open queue are drained by that reopen.
    /// Returns the message that was latched.
    pub fn clear_error(&self) -> Option<String> {
        let mut writer = self.writer.lock();
        writer.discard();
        self.latch.reset()
    }

    /// Latch a failure; returns the message to report if this is a new episode
    fn latch_failure(&self, result: SinkResult<()>) -> Option<String> {
        result.err().and_then(|e| self.latch.trip(e.to_string()))
    }

    /// Report outside the writer lock
    fn report(&self, message: Option<String>) {
        if let Some(message) = message {
            self.diagnostics.report(&message);
        }
    }
}

impl Default for RotatingFileSink {
    fn default() -> Self {
        Self::new(SinkOptions::default())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        self.close();
    }
}
