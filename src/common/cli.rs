//! CLI argument parsing for the node shell
//!
//! # Design Principles (KISS)
//! - Use clap's derive macro for declarative argument definition
//! - Command-line values override the config file, which overrides defaults

use clap::Parser;

/// Common arguments
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(short = 'f', long = "config", default_value = "twinenode.toml")]
    pub config_file: String,
}

/// Arguments for the node bootstrap binary
#[derive(Parser, Debug, Clone)]
#[command(name = "twinenode", about = "Twine node bootstrap shell")]
pub struct NodeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Root directory for node data (log files go to <root>/logs)
    #[arg(short = 'r', long = "root-dir", env = "TWINE_ROOT_DIR")]
    pub root_dir: Option<String>,

    /// Target number of log files to keep (negative = unlimited)
    #[arg(long = "log-count", allow_negative_numbers = true)]
    pub log_count: Option<i32>,

    /// Target size of log files in bytes
    #[arg(long = "log-size")]
    pub log_size: Option<u64>,
}
