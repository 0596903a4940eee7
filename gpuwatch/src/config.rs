//! Configuration module for gpuwatch
//!
//! Handles loading and validating configuration from YAML files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gpuwatch_core::health::{Probe, GPU_PROBE_NAME};
use gpuwatch_core::orchestrator::{default_nodes, DEFAULT_SUMMARY_MESSAGE};
use gpuwatch_slack::DEFAULT_API_URL;

/// Remote shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// ssh client binary
    #[serde(default = "default_ssh_program")]
    pub program: String,

    /// Extra arguments placed before the host name
    #[serde(default)]
    pub options: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            program: default_ssh_program(),
            options: Vec::new(),
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Diagnostic key for the GPU probe
    #[serde(default = "default_probe_name")]
    pub name: String,

    /// Command run on every node
    #[serde(default = "default_probe_command")]
    pub command: Vec<String>,

    /// Extra commands run on failing nodes only
    #[serde(default)]
    pub extra_diagnostics: Vec<Probe>,

    /// Probe nodes concurrently
    #[serde(default)]
    pub parallel: bool,
}

impl ProbeConfig {
    pub fn probe(&self) -> Probe {
        Probe::new(self.name.clone(), self.command.clone())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            name: default_probe_name(),
            command: default_probe_command(),
            extra_diagnostics: Vec::new(),
            parallel: false,
        }
    }
}

/// Slack alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// chat.postMessage endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Text of the first message of every alert
    #[serde(default = "default_summary_message")]
    pub summary_message: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            summary_message: default_summary_message(),
        }
    }
}

/// Metrics export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Textfile-collector path written at the end of each run
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hostnames to probe, in order
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// KEY=VALUE file holding NOTIFIED and Slack credentials
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Remote shell configuration
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Alert configuration
    #[serde(default)]
    pub alert: AlertConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Dry run mode - probe and log, but don't post or write the flag
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            state_file: default_state_file(),
            remote: RemoteConfig::default(),
            probe: ProbeConfig::default(),
            alert: AlertConfig::default(),
            metrics: MetricsConfig::default(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("nodes must not be empty");
        }
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.trim().is_empty() {
                anyhow::bail!("node names must not be blank");
            }
            if !seen.insert(node.as_str()) {
                anyhow::bail!("duplicate node name: {}", node);
            }
        }
        if self.remote.program.is_empty() {
            anyhow::bail!("remote.program must not be empty");
        }
        if self.probe.command.is_empty() {
            anyhow::bail!("probe.command must not be empty");
        }
        for extra in &self.probe.extra_diagnostics {
            if extra.command.is_empty() {
                anyhow::bail!("extra diagnostic {} has an empty command", extra.name);
            }
            if extra.name == self.probe.name {
                anyhow::bail!("extra diagnostic name {} clashes with the probe name", extra.name);
            }
        }
        if self.alert.api_url.is_empty() {
            anyhow::bail!("alert.api_url must not be empty");
        }
        Ok(())
    }
}

// Default value functions
fn default_state_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_probe_name() -> String {
    GPU_PROBE_NAME.to_string()
}

fn default_probe_command() -> Vec<String> {
    vec![GPU_PROBE_NAME.to_string()]
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_summary_message() -> String {
    DEFAULT_SUMMARY_MESSAGE.to_string()
}
