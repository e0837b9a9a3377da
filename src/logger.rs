//! Node logger wiring
//!
//! Owns the node's single file sink and connects it to `tracing`.
//! Records logged before the log directory is known are queued by the
//! sink and land at the top of the first log file.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::common::SinkResult;
use crate::filelog::{FileSinkLayer, RotatingFileSink, RotationConfig, SinkOptions};

/// File name prefix for node log files (`twinelog.0`, `twinelog.1`, ...)
pub const LOG_PREFIX: &str = "twinelog";

/// Default number of log files kept
pub const DEFAULT_LOG_COUNT: i32 = 10;

/// Default log file size budget in bytes
pub const DEFAULT_LOG_SIZE: u64 = 1024 * 1024;

/// Node-level owner of the rotating file sink
pub struct NodeLogger {
    sink: Arc<RotatingFileSink>,
    file_success: bool,
}

impl NodeLogger {
    pub fn new(options: SinkOptions) -> Self {
        Self::with_sink(RotatingFileSink::new(options))
    }

    /// Wrap a pre-built sink (custom formatter, diagnostics, opener)
    pub fn with_sink(sink: RotatingFileSink) -> Self {
        Self {
            sink: Arc::new(sink),
            file_success: false,
        }
    }

    /// Point the file sink at `dir`, creating it if needed
    ///
    /// Returns whether log files could be opened; failures are logged,
    /// not returned, so the caller decides whether they are fatal.
    pub fn set_log_dir(&mut self, dir: &Path, count: i32, size: u64) -> bool {
        self.open_files(RotationConfig::new(dir, LOG_PREFIX, count, size))
    }

    /// Configure the sink with explicit rotation parameters
    pub fn set_rotation(&mut self, config: RotationConfig) -> bool {
        self.open_files(Ok(config))
    }

    fn open_files(&mut self, config: SinkResult<RotationConfig>) -> bool {
        let result = config.and_then(|config| {
            let directory = config.directory().to_path_buf();
            self.sink.configure(config).map(|()| directory)
        });

        self.file_success = match result {
            Ok(directory) => {
                info!(directory = %directory.display(), "File logging enabled");
                true
            }
            Err(e) => {
                error!(error = %e, "Error when setting log directory");
                error!("Unable to open log files");
                false
            }
        };
        self.file_success
    }

    pub fn file_success(&self) -> bool {
        self.file_success
    }

    pub fn sink(&self) -> &Arc<RotatingFileSink> {
        &self.sink
    }

    /// `tracing` layer feeding this logger's sink
    pub fn file_layer(&self) -> FileSinkLayer {
        FileSinkLayer::new(self.sink.clone())
    }

    /// Flush and close the file sink
    pub fn close(&self) {
        self.sink.flush();
        self.sink.close();
    }
}

impl Default for NodeLogger {
    fn default() -> Self {
        Self::new(SinkOptions::default())
    }
}
