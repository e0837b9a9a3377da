//! Sink counters
//!
//! # Design Principles (KISS)
//! - Lock-free atomic counters, updated from inside and outside the writer lock
//! - Simple snapshot mechanism for reporting

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracked by the rotating file sink
///
/// All operations use Relaxed ordering. Statistics are eventually
/// consistent, which is acceptable for monitoring.
#[derive(Debug)]
pub struct SinkCounters {
    /// Records written to a log file
    pub written: AtomicU64,
    /// Records parked in the pre-open queue
    pub queued: AtomicU64,
    /// Records discarded (closed sink or latched error)
    pub dropped: AtomicU64,
    /// Bytes handed to the active file (banners excluded)
    pub bytes: AtomicU64,
    /// Files opened by the rotation policy
    pub rotations: AtomicU64,
    /// Files removed by retention
    pub pruned: AtomicU64,
}

impl SinkCounters {
    /// Create new zeroed counters
    pub fn new() -> Self {
        Self {
            written: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn inc_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_rotations(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_pruned(&self, n: u64) {
        self.pruned.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    pub fn snapshot(&self) -> SinkStats {
        SinkStats {
            written: self.written.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

impl Default for SinkCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub written: u64,
    pub queued: u64,
    pub dropped: u64,
    pub bytes: u64,
    pub rotations: u64,
    pub pruned: u64,
}

impl SinkStats {
    /// Format written bytes as a human-readable string (KB, MB, ...)
    pub fn format_bytes(&self) -> String {
        let bytes = self.bytes as f64;
        if bytes >= 1_000_000_000.0 {
            format!("{:.2} GB", bytes / 1_000_000_000.0)
        } else if bytes >= 1_000_000.0 {
            format!("{:.2} MB", bytes / 1_000_000.0)
        } else if bytes >= 1_000.0 {
            format!("{:.2} KB", bytes / 1_000.0)
        } else {
            format!("{} B", self.bytes)
        }
    }
}
