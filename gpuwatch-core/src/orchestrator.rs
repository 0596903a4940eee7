//! Run orchestration
//!
//! One invocation walks this state machine:
//!
//! - reset directive → RESET_REQUESTED: flag := "False" (unless dry run), stop
//! - flag == "True" → ALREADY_NOTIFIED: stop, nothing probed or posted
//! - otherwise → PROBING every configured node
//! - no failures → ALL_HEALTHY: stop, flag untouched
//! - failures → ALERTING: summary, then one message per failing node in
//!   probe order, then flag := "True" → DONE
//!
//! A dry run composes the alert messages but posts nothing and never writes
//! the flag. Every terminal state stamps the last-run metric.
//!
//! Only store errors abort a run. Probe failures become alerts, and alert
//! delivery failures are logged and counted.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::alert::{AlertCredentials, AlertSink};
use crate::health::{Node, NodeHealthCheck};
use crate::metrics::MetricsRegistry;
use crate::store::{
    is_notified, StateStore, StoreError, NOTIFIED_FALSE, NOTIFIED_KEY, NOTIFIED_TRUE,
};

/// Default text of the summary alert
pub const DEFAULT_SUMMARY_MESSAGE: &str = "GPU cluster failure detected!";

/// States of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Flag cleared on request (terminal)
    ResetRequested,
    /// Flag already set, nothing to do (terminal)
    AlreadyNotified,
    /// Probing nodes
    Probing,
    /// Every node passed (terminal)
    AllHealthy,
    /// Posting alerts for failed nodes
    AlertingInProgress,
    /// Alerting finished; flag set unless this is a dry run (terminal)
    Done,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Probing | RunState::AlertingInProgress)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::ResetRequested => write!(f, "RESET_REQUESTED"),
            RunState::AlreadyNotified => write!(f, "ALREADY_NOTIFIED"),
            RunState::Probing => write!(f, "PROBING"),
            RunState::AllHealthy => write!(f, "ALL_HEALTHY"),
            RunState::AlertingInProgress => write!(f, "ALERTING_IN_PROGRESS"),
            RunState::Done => write!(f, "DONE"),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hostnames to probe, in order
    pub nodes: Vec<String>,
    /// Text of the summary alert
    pub summary_message: String,
    /// Probe nodes concurrently; results keep configured order
    pub parallel: bool,
    /// Probe and compose alerts, but post nothing and leave the flag alone
    pub dry_run: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            summary_message: DEFAULT_SUMMARY_MESSAGE.to_string(),
            parallel: false,
            dry_run: false,
        }
    }
}

/// The stock node list: node01 through node07
pub fn default_nodes() -> Vec<String> {
    (1..=7).map(|i| format!("node{:02}", i)).collect()
}

/// Result of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal state reached
    pub state: RunState,
    /// Probed nodes in probe order (empty if nothing was probed)
    pub nodes: Vec<Node>,
    /// Messages composed for posting, in posting order
    pub messages: Vec<String>,
    /// Alerts delivered successfully
    pub alerts_delivered: usize,
    /// Alerts that failed to deliver
    pub alerts_failed: usize,
    /// Value written to the notified flag, if any
    pub flag_written: Option<String>,
}

impl RunReport {
    fn terminal(state: RunState) -> Self {
        Self {
            state,
            nodes: Vec::new(),
            messages: Vec::new(),
            alerts_delivered: 0,
            alerts_failed: 0,
            flag_written: None,
        }
    }

    /// Nodes whose probe failed, in probe order
    pub fn failed_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.functional)
    }
}

/// Detail alert for one failing node
pub fn node_failure_message(node: &Node) -> String {
    format!("Node {} failed with error: {:?}", node.name, node.diagnostics)
}

/// Drives one probe-and-alert run
pub struct Orchestrator {
    config: OrchestratorConfig,
    health_check: NodeHealthCheck,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn AlertSink>,
    metrics: Arc<MetricsRegistry>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        health_check: NodeHealthCheck,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn AlertSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            config,
            health_check,
            store,
            sink,
            metrics,
        }
    }

    /// Clear the notified flag so the next failure is reported again
    pub fn reset(&self) -> Result<RunReport, StoreError> {
        let mut report = RunReport::terminal(RunState::ResetRequested);

        if self.config.dry_run {
            info!(state = %RunState::ResetRequested, "[DRY-RUN] Would reset notification flag");
        } else {
            self.store.set(NOTIFIED_KEY, NOTIFIED_FALSE)?;
            info!(state = %RunState::ResetRequested, "Notification flag reset");
            report.flag_written = Some(NOTIFIED_FALSE.to_string());
        }

        self.metrics.mark_run_complete();
        Ok(report)
    }

    /// Run one pass: check the flag, probe, alert if needed
    pub async fn run(&self) -> Result<RunReport, StoreError> {
        let notified = self.store.get(NOTIFIED_KEY)?;
        if is_notified(&notified) {
            info!(state = %RunState::AlreadyNotified, "Failure already reported, skipping probes");
            self.metrics.mark_run_complete();
            return Ok(RunReport::terminal(RunState::AlreadyNotified));
        }

        info!(
            state = %RunState::Probing,
            nodes = self.config.nodes.len(),
            parallel = self.config.parallel,
            "Probing nodes"
        );
        let nodes = self.probe_all().await;
        let failed = nodes.iter().filter(|n| !n.functional).count();

        if failed == 0 {
            info!(state = %RunState::AllHealthy, "All nodes functional");
            self.metrics.mark_run_complete();
            let mut report = RunReport::terminal(RunState::AllHealthy);
            report.nodes = nodes;
            return Ok(report);
        }

        warn!(
            state = %RunState::AlertingInProgress,
            failed = failed,
            total = nodes.len(),
            "GPU failures detected"
        );
        let report = self.alert(nodes).await?;
        self.metrics.mark_run_complete();
        Ok(report)
    }

    async fn probe_all(&self) -> Vec<Node> {
        let mut nodes = Node::from_hostnames(&self.config.nodes);

        if self.config.parallel {
            let checks = nodes.iter_mut().map(|node| self.health_check.check(node));
            futures::future::join_all(checks).await;
        } else {
            for node in nodes.iter_mut() {
                self.health_check.check(node).await;
            }
        }

        for node in &nodes {
            self.metrics.record_probe(&node.name, node.functional);
        }
        nodes
    }

    async fn alert(&self, nodes: Vec<Node>) -> Result<RunReport, StoreError> {
        let mut messages = Vec::with_capacity(1 + nodes.len());
        messages.push(self.config.summary_message.clone());
        messages.extend(
            nodes
                .iter()
                .filter(|n| !n.functional)
                .map(node_failure_message),
        );

        let mut report = RunReport::terminal(RunState::Done);
        report.nodes = nodes;

        if self.config.dry_run {
            for message in &messages {
                info!(message = %message, "[DRY-RUN] Would post alert");
            }
            report.messages = messages;
            return Ok(report);
        }

        let credentials = AlertCredentials::load(self.store.as_ref()).map_err(|e| {
            error!(error = %e, "Cannot load alert credentials");
            e
        })?;

        for message in &messages {
            match self.sink.post(&credentials, message).await {
                Ok(()) => {
                    report.alerts_delivered += 1;
                    self.metrics.record_alert(true);
                }
                Err(e) => {
                    warn!(error = %e, "Alert delivery failed, continuing");
                    report.alerts_failed += 1;
                    self.metrics.record_alert(false);
                }
            }
        }

        self.store.set(NOTIFIED_KEY, NOTIFIED_TRUE)?;
        report.flag_written = Some(NOTIFIED_TRUE.to_string());
        report.messages = messages;

        info!(
            state = %RunState::Done,
            delivered = report.alerts_delivered,
            failed = report.alerts_failed,
            "Alerting complete"
        );
        debug!(flag = NOTIFIED_TRUE, "Notification flag set");
        Ok(report)
    }
}
