//! Sticky error latch and diagnostic channel
//!
//! Logging must never fail the code it instruments. The first I/O
//! failure trips the latch; from then on the sink accepts and silently
//! drops records, and the failure is reported exactly once.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Out-of-band channel for sink failures
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Reports sink failures as `tracing` error events
///
/// The file layer skips events from this module's target, so these only
/// reach the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, message: &str) {
        tracing::error!(error = %message, "Log file sink failure");
    }
}

/// One-way error flag
#[derive(Debug, Default)]
pub struct ErrorLatch {
    tripped: AtomicBool,
    message: Mutex<Option<String>>,
}

impl ErrorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Set the latch
    ///
    /// Returns the message to report if this call tripped it, `None` if
    /// it was already set.
    pub fn trip(&self, message: impl Into<String>) -> Option<String> {
        let mut slot = self.message.lock();
        if self.tripped.swap(true, Ordering::AcqRel) {
            return None;
        }
        let message = message.into();
        *slot = Some(message.clone());
        Some(message)
    }

    /// Message of the failure that tripped the latch
    pub fn message(&self) -> Option<String> {
        self.message.lock().clone()
    }

    /// Clear the latch, starting a new failure episode
    ///
    /// Returns the message that was latched.
    pub fn reset(&self) -> Option<String> {
        let mut slot = self.message.lock();
        self.tripped.store(false, Ordering::Release);
        slot.take()
    }
}
