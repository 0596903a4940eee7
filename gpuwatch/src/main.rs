//! gpuwatch
//!
//! Probes a set of GPU nodes over ssh with `nvidia-smi` and posts a Slack
//! alert the first time any of them fails. Further runs stay quiet until
//! `--reset` clears the notified flag. Meant to be run from cron or a
//! systemd timer.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use gpuwatch_core::executor::SshExecutor;
use gpuwatch_core::health::NodeHealthCheck;
use gpuwatch_core::metrics::MetricsRegistry;
use gpuwatch_core::orchestrator::{Orchestrator, OrchestratorConfig, RunReport};
use gpuwatch_core::store::EnvFileStore;
use gpuwatch_slack::{SlackClient, SlackSink};

/// Initialize the tracing/logging subsystem
fn init_logging(log_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Load the config file (or defaults) and apply CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        warn!(path = ?cli.config, "Config file not found, using defaults");
        Config::default()
    };

    if let Some(state_file) = &cli.state_file {
        config.state_file = state_file.clone();
    }
    if !cli.nodes.is_empty() {
        config.nodes = cli.nodes.clone();
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Wire the core components together from configuration
fn build_orchestrator(config: &Config, metrics: Arc<MetricsRegistry>) -> Orchestrator {
    let executor = Arc::new(SshExecutor::new(
        config.remote.program.clone(),
        config.remote.options.clone(),
    ));
    let health_check = NodeHealthCheck::new(executor, config.probe.probe())
        .with_extra_diagnostics(config.probe.extra_diagnostics.clone());
    let store = Arc::new(EnvFileStore::new(config.state_file.clone()));
    let sink = Arc::new(SlackSink::new(SlackClient::new(config.alert.api_url.clone())));

    let orchestrator_config = OrchestratorConfig {
        nodes: config.nodes.clone(),
        summary_message: config.alert.summary_message.clone(),
        parallel: config.probe.parallel,
        dry_run: config.dry_run,
    };

    Orchestrator::new(orchestrator_config, health_check, store, sink, metrics)
}

fn log_report(report: &RunReport) {
    let failed: Vec<&str> = report.failed_nodes().map(|n| n.name.as_str()).collect();
    info!(
        state = %report.state,
        probed = report.nodes.len(),
        failed = ?failed,
        delivered = report.alerts_delivered,
        undelivered = report.alerts_failed,
        flag = ?report.flag_written,
        "Run finished"
    );
}

/// Load configuration, then reset the flag or run one probe pass
async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    info!(
        state_file = ?config.state_file,
        nodes = config.nodes.len(),
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
    let orchestrator = build_orchestrator(&config, metrics.clone());

    let report = if cli.reset {
        orchestrator
            .reset()
            .context("Failed to reset notification flag")?
    } else {
        orchestrator.run().await.context("Run aborted")?
    };
    log_report(&report);

    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = metrics.write_textfile(path) {
            error!(path = ?path, error = %e, "Failed to write metrics textfile");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "gpuwatch starting");

    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpuwatch.yaml");
        std::fs::write(&path, "nodes: [node01, node02]\n").unwrap();

        let cli = Cli::try_parse_from([
            "gpuwatch",
            "-c",
            path.to_str().unwrap(),
            "--node",
            "node09",
            "--state-file",
            "/tmp/gpuwatch-state.env",
            "--dry-run",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.nodes, vec!["node09"]);
        assert_eq!(config.state_file.to_str().unwrap(), "/tmp/gpuwatch-state.env");
        assert!(config.dry_run);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let cli = Cli::try_parse_from(["gpuwatch", "-c", "/nonexistent/gpuwatch.yaml"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.nodes.len(), 7);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpuwatch.yaml");
        std::fs::write(&path, "nodes: []\n").unwrap();

        let cli = Cli::try_parse_from(["gpuwatch", "-c", path.to_str().unwrap()]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    /// Config with an ssh program that cannot be spawned, so every node fails
    fn unreachable_setup(state: &str) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("gpuwatch.yaml");
        std::fs::write(&config, "remote:\n  program: /nonexistent/gpuwatch-ssh\n").unwrap();
        let state_file = dir.path().join(".env");
        std::fs::write(&state_file, state).unwrap();
        (dir, config, state_file)
    }

    fn cli_for(config: &Path, state_file: &Path, extra: &[&str]) -> Cli {
        let mut args = vec![
            "gpuwatch",
            "-c",
            config.to_str().unwrap(),
            "--state-file",
            state_file.to_str().unwrap(),
            "--node",
            "node01",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_reset_writes_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join(".env");
        std::fs::write(&state, "NOTIFIED=True\nSLACK_CHANNEL_ID=C0GPU\n").unwrap();

        let config = Config {
            state_file: state.clone(),
            ..Default::default()
        };
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let orchestrator = build_orchestrator(&config, metrics);
        orchestrator.reset().unwrap();

        assert_eq!(
            std::fs::read_to_string(&state).unwrap(),
            "NOTIFIED=False\nSLACK_CHANNEL_ID=C0GPU\n"
        );
    }

    #[tokio::test]
    async fn test_run_missing_token_fails_and_keeps_flag() {
        let original = "NOTIFIED=False\nSLACK_CHANNEL_ID=C0GPU\n";
        let (_dir, config, state_file) = unreachable_setup(original);

        let cli = cli_for(&config, &state_file, &[]);
        let err = run(cli).await.unwrap_err();
        assert!(format!("{:#}", err).contains("SLACK_OAUTH_TOKEN"));
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), original);
    }

    #[tokio::test]
    async fn test_run_missing_flag_fails() {
        let (_dir, config, state_file) = unreachable_setup("SLACK_CHANNEL_ID=C0GPU\n");

        let cli = cli_for(&config, &state_file, &[]);
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_run_reset_clears_flag() {
        let (_dir, config, state_file) = unreachable_setup("NOTIFIED=True\n");

        let cli = cli_for(&config, &state_file, &["--reset"]);
        run(cli).await.unwrap();
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "NOTIFIED=False\n");
    }

    #[tokio::test]
    async fn test_run_dry_run_reset_leaves_state_file() {
        let (_dir, config, state_file) = unreachable_setup("NOTIFIED=True\n");

        let cli = cli_for(&config, &state_file, &["--reset", "--dry-run"]);
        run(cli).await.unwrap();
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "NOTIFIED=True\n");
    }

    #[tokio::test]
    async fn test_run_already_notified_writes_metrics() {
        let (dir, config, state_file) = unreachable_setup("NOTIFIED=True\n");
        let textfile = dir.path().join("gpuwatch.prom");
        std::fs::write(
            &config,
            format!(
                "remote:\n  program: /nonexistent/gpuwatch-ssh\nmetrics:\n  textfile: {}\n",
                textfile.display()
            ),
        )
        .unwrap();

        let cli = cli_for(&config, &state_file, &[]);
        run(cli).await.unwrap();

        let exposition = std::fs::read_to_string(&textfile).unwrap();
        assert!(exposition.contains("gpuwatch_last_run_timestamp_seconds"));
        assert!(!exposition.contains("gpuwatch_last_run_timestamp_seconds 0\n"));
        assert_eq!(std::fs::read_to_string(&state_file).unwrap(), "NOTIFIED=True\n");
    }
}
