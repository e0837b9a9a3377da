//! Periodic timestamp marker
//!
//! Every `period` a blank line, a `HH:mm (dd MMM yyyy)` line and another
//! blank line are injected into the stream and the file is flushed. The
//! marker bypasses the record formatter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::RotatingFileSink;
use crate::common::ShutdownReceiver;

/// Default marker cadence
pub const DEFAULT_MARKER_PERIOD: Duration = Duration::from_secs(60);

/// chrono pattern for `HH:mm (dd MMM yyyy)`
pub const TIMESTAMP_FORMAT: &str = "%H:%M (%d %b %Y)";

/// Human-readable timestamp used by banners and markers
pub fn timestamp_string(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Marker text for the given time
pub fn marker_text(now: DateTime<Local>) -> String {
    format!("\n{}\n\n", timestamp_string(now))
}

/// Tracks when the last marker was emitted
#[derive(Debug)]
pub struct PeriodicMarker {
    period: Option<Duration>,
    last: Mutex<Option<Instant>>,
}

impl PeriodicMarker {
    /// `None` disables markers
    pub fn new(period: Option<Duration>) -> Self {
        Self {
            period,
            last: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Claim the marker if one is due
    ///
    /// The first call always claims. Exactly one concurrent caller wins
    /// each period.
    pub fn claim(&self, now: Instant) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        let mut last = self.last.lock();
        let due = match *last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= period,
        };
        if due {
            *last = Some(now);
        }
        due
    }
}

/// Drive [`RotatingFileSink::tick`] from a tokio interval
///
/// Gives idle periods a checkpoint: the marker and throttled flushes
/// happen even when nothing is published. Stops on shutdown.
pub fn spawn_marker_task(
    sink: Arc<RotatingFileSink>,
    period: Duration,
    mut shutdown: ShutdownReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("Marker task shutting down");
                    break;
                }

                _ = interval.tick() => {
                    sink.tick();
                    debug!(state = %sink.state(), "Marker tick");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let t = Local.with_ymd_and_hms(2017, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(timestamp_string(t), "07:05 (09 Mar 2017)");
        assert_eq!(marker_text(t), "\n07:05 (09 Mar 2017)\n\n");
    }

    #[test]
    fn test_first_claim_always_due() {
        let marker = PeriodicMarker::new(Some(Duration::from_secs(3600)));
        let now = Instant::now();
        assert!(marker.claim(now));
        assert!(!marker.claim(now + Duration::from_secs(10)));
        assert!(marker.claim(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_disabled_marker() {
        let marker = PeriodicMarker::new(None);
        assert!(!marker.claim(Instant::now()));
        assert_eq!(marker.period(), None);
    }

    #[test]
    fn test_zero_period_always_due() {
        let marker = PeriodicMarker::new(Some(Duration::ZERO));
        let now = Instant::now();
        assert!(marker.claim(now));
        assert!(marker.claim(now));
    }
}
