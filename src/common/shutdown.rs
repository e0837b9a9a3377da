//! Shutdown handling for the node shell
//!
//! # Design Principles (KISS)
//! - Single function to setup Ctrl+C handler with broadcast channel
//! - Returns (sender, receiver); background tasks resubscribe as needed

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown signal type (unit type, just signals "shutdown now")
pub type ShutdownSignal = ();

/// Shutdown channel sender
pub type ShutdownSender = broadcast::Sender<ShutdownSignal>;

/// Shutdown channel receiver
pub type ShutdownReceiver = broadcast::Receiver<ShutdownSignal>;

/// Create a shutdown channel without any signal handler attached
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<ShutdownSignal>(1)
}

/// Setup shutdown handling with Ctrl+C signal
///
/// Creates a broadcast channel and spawns a task that sends on Ctrl+C.
///
/// # Example
/// ```ignore
/// let (_shutdown_tx, shutdown_rx) = setup_shutdown();
/// let marker = spawn_marker_task(sink.clone(), period, shutdown_rx.resubscribe());
/// ```
pub fn setup_shutdown() -> (ShutdownSender, ShutdownReceiver) {
    let (tx, rx) = shutdown_channel();

    let tx_clone = tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, initiating shutdown"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        let _ = tx_clone.send(());
    });

    (tx, rx)
}
