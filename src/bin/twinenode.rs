//! Node bootstrap binary - sets up console and file logging
//!
//! Usage:
//!   cargo run --bin twinenode                                  # Use defaults
//!   cargo run --bin twinenode -- --config twinenode.toml       # Use config file
//!   cargo run --bin twinenode -- --root-dir /srv/twine --log-count 5

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use twinelog_rs::common::{setup_shutdown, NodeArgs};
use twinelog_rs::config::Config;
use twinelog_rs::filelog::spawn_marker_task;
use twinelog_rs::logger::NodeLogger;

/// Lower bound for the housekeeping interval
const MIN_TICK_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    // Load configuration; a missing file means defaults
    let mut config = if Path::new(&args.common.config_file).exists() {
        Config::load(&args.common.config_file)?
    } else {
        Config::default()
    };

    // Command-line overrides
    if let Some(root_dir) = &args.root_dir {
        config.node.root_dir = root_dir.clone();
    }
    if let Some(count) = args.log_count {
        config.log.count = count;
    }
    if let Some(size) = args.log_size {
        config.log.size = size;
    }

    let file_level = config.log.file_level_filter()?;
    let console_level = config.log.console_level_filter()?;
    let options = config.log.sink_options();
    let mut logger = NodeLogger::new(options);

    // Initialize tracing: console plus the (initially queueing) file sink
    tracing_subscriber::registry()
        .with(
            fmt::layer().with_filter(
                EnvFilter::from_default_env()
                    .add_directive(format!("twinelog_rs={}", console_level).parse()?),
            ),
        )
        .with(logger.file_layer().with_filter(file_level))
        .try_init()?;

    info!(config_file = %args.common.config_file, "Twine node starting");

    let rotation = config.log.rotation_config(&config.node.root_dir())?;
    if !logger.set_rotation(rotation) {
        error!("Log files are required, exiting");
        logger.close();
        std::process::exit(1);
    }

    let tick_period = options
        .marker_period
        .map_or(options.min_flush_period, |m| m.min(options.min_flush_period))
        .max(MIN_TICK_PERIOD);

    let (_shutdown_tx, mut shutdown_rx) = setup_shutdown();
    let marker = spawn_marker_task(logger.sink().clone(), tick_period, shutdown_rx.resubscribe());

    info!(
        root_dir = %config.node.root_dir,
        tick_ms = tick_period.as_millis() as u64,
        "Twine node running"
    );

    let _ = shutdown_rx.recv().await;
    if let Err(e) = marker.await {
        warn!(error = %e, "Marker task ended abnormally");
    }

    let stats = logger.sink().stats();
    info!(
        written = stats.written,
        rotations = stats.rotations,
        pruned = stats.pruned,
        "Twine node stopped"
    );
    logger.close();
    Ok(())
}
