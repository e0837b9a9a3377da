//! Sink lifecycle state
//!
//! ```text
//!   ┌─────────┐  configure  ┌────────┐
//!   │ Initial │ ──────────► │ Opened │
//!   └─────────┘             └────────┘
//!        │                      │
//!        │ close                │ close
//!        ▼                      ▼
//!   ┌──────────────────────────────┐
//!   │            Closed            │
//!   └──────────────────────────────┘
//! ```
//!
//! Transitions never reverse. The state lives in a single atomic cell and
//! only moves forward through compare-and-set, so exactly one racer wins.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the rotating file sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkState {
    /// Created, no directory configured; records are queued
    #[default]
    Initial,
    /// Directory configured; records are written to disk
    Opened,
    /// Terminal; records are dropped
    Closed,
}

impl SinkState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SinkState) -> bool {
        use SinkState::*;
        matches!(
            (self, target),
            (Initial, Opened) | (Initial, Closed) | (Opened, Closed)
        )
    }

    fn as_u8(self) -> u8 {
        match self {
            SinkState::Initial => 0,
            SinkState::Opened => 1,
            SinkState::Closed => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SinkState::Initial,
            1 => SinkState::Opened,
            _ => SinkState::Closed,
        }
    }
}

impl std::fmt::Display for SinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkState::Initial => write!(f, "Initial"),
            SinkState::Opened => write!(f, "Opened"),
            SinkState::Closed => write!(f, "Closed"),
        }
    }
}

/// Atomic cell holding a [`SinkState`]
#[derive(Debug)]
pub struct LifecycleCell {
    raw: AtomicU8,
}

impl LifecycleCell {
    pub fn new() -> Self {
        Self {
            raw: AtomicU8::new(SinkState::Initial.as_u8()),
        }
    }

    /// Current state
    #[inline]
    pub fn get(&self) -> SinkState {
        SinkState::from_u8(self.raw.load(Ordering::Acquire))
    }

    /// Move from `from` to `to` if the cell still holds `from`
    ///
    /// Returns the observed state on failure. Invalid transitions are
    /// rejected without touching the cell.
    pub fn transition(&self, from: SinkState, to: SinkState) -> Result<(), SinkState> {
        if !from.can_transition_to(to) {
            return Err(self.get());
        }
        self.raw
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(SinkState::from_u8)
    }
}

impl Default for LifecycleCell {
    fn default() -> Self {
        Self::new()
    }
}
