//! Common infrastructure shared by the sink and the node shell
//!
//! Errors, counters, CLI arguments and shutdown signalling.

pub mod cli;
pub use cli::{CommonArgs, NodeArgs};

pub mod error;
pub use error::{SinkError, SinkResult};

pub mod metrics;
pub use metrics::{SinkCounters, SinkStats};

pub mod shutdown;
pub use shutdown::{
    setup_shutdown, shutdown_channel, ShutdownReceiver, ShutdownSender, ShutdownSignal,
};
