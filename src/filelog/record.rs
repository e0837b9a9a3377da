//! Log records and the record formatter seam
//!
//! The sink never inspects a record; it only hands it to a
//! [`RecordFormatter`] and writes the resulting text verbatim.

use chrono::{DateTime, Local};
use tracing::Level;

/// A structured log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
    /// Extra structured fields, in emission order
    pub fields: Vec<(String, String)>,
    pub timestamp: DateTime<Local>,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            target: String::new(),
            message: message.into(),
            fields: Vec::new(),
            timestamp: Local::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Renders a record into the exact text written to the file
///
/// The output must carry its own line terminator.
pub trait RecordFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

impl<F> RecordFormatter for F
where
    F: Fn(&LogRecord) -> String + Send + Sync,
{
    fn format(&self, record: &LogRecord) -> String {
        self(record)
    }
}

/// Default formatter: `LEVEL:` padded to 9 columns, message, fields
///
/// ```text
/// INFO:    Node started root=/srv/twine
/// ERROR:   Unable to load consensus library
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelFormatter;

impl RecordFormatter for LevelFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut line = format!("{:<9}{}", format!("{}:", record.level), record.message);
        for (name, value) in &record.fields {
            line.push(' ');
            line.push_str(name);
            line.push('=');
            line.push_str(value);
        }
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_formatter_padding() {
        let record = LogRecord::new(Level::INFO, "Node started");
        assert_eq!(LevelFormatter.format(&record), "INFO:    Node started\n");

        let record = LogRecord::new(Level::ERROR, "boom");
        assert_eq!(LevelFormatter.format(&record), "ERROR:   boom\n");
    }

    #[test]
    fn test_level_formatter_fields() {
        let record = LogRecord::new(Level::WARN, "Slow peer")
            .with_field("peer", "10.0.0.1")
            .with_field("ms", "250");
        assert_eq!(
            LevelFormatter.format(&record),
            "WARN:    Slow peer peer=10.0.0.1 ms=250\n"
        );
    }

    #[test]
    fn test_closure_formatter() {
        let formatter = |r: &LogRecord| format!("[{}] {}\n", r.target, r.message);
        let record = LogRecord::new(Level::DEBUG, "hello").with_target("node");
        assert_eq!(formatter.format(&record), "[node] hello\n");
    }
}
