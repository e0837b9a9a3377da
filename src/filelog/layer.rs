//! `tracing` bridge into the file sink
//!
//! Every event becomes a [`LogRecord`] and is published to the shared
//! sink. Events emitted from inside the sink are skipped so the sink
//! never feeds on its own diagnostics while holding the writer lock.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::{LogRecord, RotatingFileSink, SINK_TARGET};

/// Layer publishing `tracing` events to a [`RotatingFileSink`]
#[derive(Clone)]
pub struct FileSinkLayer {
    sink: Arc<RotatingFileSink>,
}

impl FileSinkLayer {
    pub fn new(sink: Arc<RotatingFileSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<RotatingFileSink> {
        &self.sink
    }
}

impl<S> Layer<S> for FileSinkLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(SINK_TARGET) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            level: *meta.level(),
            target: meta.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
            timestamp: Local::now(),
        };
        self.sink.publish(&record);
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .push((field.name().to_string(), format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filelog::{RotationConfig, SinkOptions};
    use std::fs;
    use tempfile::TempDir;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    fn opened_sink(tmp: &TempDir) -> Arc<RotatingFileSink> {
        let sink = Arc::new(RotatingFileSink::new(SinkOptions {
            marker_period: None,
            ..Default::default()
        }));
        sink.configure(RotationConfig::new(tmp.path(), "log", 10, 100_000).unwrap())
            .unwrap();
        sink
    }

    #[test]
    fn test_events_reach_file() {
        let tmp = TempDir::new().unwrap();
        let sink = opened_sink(&tmp);
        let subscriber = Registry::default().with(FileSinkLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(peer = "10.0.0.1", height = 42, "Peer connected");
            tracing::warn!("Clock drift");
        });
        sink.close();

        let text = fs::read_to_string(tmp.path().join("log.0")).unwrap();
        assert!(text.contains("INFO:    Peer connected peer=10.0.0.1 height=42\n"));
        assert!(text.contains("WARN:    Clock drift\n"));
    }

    #[test]
    fn test_sink_events_skipped() {
        let tmp = TempDir::new().unwrap();
        let sink = opened_sink(&tmp);
        let subscriber = Registry::default().with(FileSinkLayer::new(sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "twinelog_rs::filelog::writer", "internal");
            tracing::info!(target: "node", "external");
        });
        sink.close();

        let text = fs::read_to_string(tmp.path().join("log.0")).unwrap();
        assert!(!text.contains("internal"));
        assert!(text.contains("external"));
    }
}
