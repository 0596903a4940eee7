//! Node health checks
//!
//! A node is functional if and only if its GPU probe writes nothing to
//! stderr. An unreachable node fails the same way as a node whose driver
//! reports a hardware error: both end up with `functional == false` and the
//! raw error text in the diagnostic map. The two cases are not told apart.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::executor::RemoteExecutor;

/// Probe name used for the GPU inventory query
pub const GPU_PROBE_NAME: &str = "nvidia-smi";

/// A named command run on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Key under which output is stored in the diagnostic map
    pub name: String,
    /// Command and arguments run on the remote host
    pub command: Vec<String>,
}

impl Probe {
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }

    /// The default GPU inventory probe: `nvidia-smi` with no arguments
    pub fn gpu_inventory() -> Self {
        Self::new(GPU_PROBE_NAME, vec![GPU_PROBE_NAME.to_string()])
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::gpu_inventory()
    }
}

/// A remote compute node and the outcome of its health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Hostname
    pub name: String,
    /// Whether the GPU probe produced no error output
    pub functional: bool,
    /// Raw diagnostic text keyed by probe name, empty unless the node failed
    pub diagnostics: BTreeMap<String, String>,
    /// When the node was last probed
    pub checked_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create an unchecked node, assumed functional
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functional: true,
            diagnostics: BTreeMap::new(),
            checked_at: None,
        }
    }

    /// Build the node list for a run from configured hostnames
    pub fn from_hostnames<S: AsRef<str>>(hosts: &[S]) -> Vec<Node> {
        hosts.iter().map(|h| Node::new(h.as_ref())).collect()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Runs the GPU probe against nodes through a remote executor
pub struct NodeHealthCheck {
    executor: Arc<dyn RemoteExecutor>,
    probe: Probe,
    extra_diagnostics: Vec<Probe>,
}

impl NodeHealthCheck {
    /// Create a health check using the given probe
    pub fn new(executor: Arc<dyn RemoteExecutor>, probe: Probe) -> Self {
        Self {
            executor,
            probe,
            extra_diagnostics: Vec::new(),
        }
    }

    /// Additional probes run only on failing nodes, for richer alerts
    pub fn with_extra_diagnostics(mut self, probes: Vec<Probe>) -> Self {
        self.extra_diagnostics = probes;
        self
    }

    /// Name of the main probe
    pub fn probe_name(&self) -> &str {
        &self.probe.name
    }

    /// Check a single node, updating its functional flag and diagnostics
    pub async fn check(&self, node: &mut Node) -> bool {
        debug!(node = %node.name, probe = %self.probe.name, "Probing node");

        let output = self.executor.run(&node.name, &self.probe.command).await;
        node.checked_at = Some(Utc::now());
        node.functional = !output.has_error();

        if node.functional {
            debug!(node = %node.name, "Node GPUs functional");
            return true;
        }

        warn!(node = %node.name, error = %output.stderr.trim_end(), "Node GPU probe failed");
        node.diagnostics.insert(self.probe.name.clone(), output.stderr);

        for extra in &self.extra_diagnostics {
            let output = self.executor.run(&node.name, &extra.command).await;
            let text = if output.stdout.is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            node.diagnostics.insert(extra.name.clone(), text);
        }

        false
    }
}
