//! CLI argument parsing for gpuwatch

use std::path::PathBuf;

use clap::Parser;

/// gpuwatch - check cluster nodes for GPU failures and alert once
#[derive(Debug, Parser)]
#[command(name = "gpuwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Reset the notification flag to allow sending messages again
    #[arg(long)]
    pub reset: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "gpuwatch.yaml")]
    pub config: PathBuf,

    /// State file holding NOTIFIED and Slack credentials (overrides config)
    #[arg(long, env = "GPUWATCH_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Node to probe; repeat to probe several (overrides config)
    #[arg(long = "node", value_name = "HOST")]
    pub nodes: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GPUWATCH_LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, default_value = "false", env = "GPUWATCH_LOG_JSON")]
    pub log_json: bool,

    /// Dry run mode - probe and log, but don't post alerts or write the flag
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
