//! Prometheus metrics for gpuwatch
//!
//! gpuwatch runs once and exits, so metrics are not scraped from a server.
//! Instead the exposition text can be written to a file picked up by the
//! node-exporter textfile collector.

use std::path::Path;

use prometheus::{opts, Encoder, Gauge, GaugeVec, IntCounterVec, Registry, TextEncoder};

/// Metrics registry wrapper
///
/// Every instance owns its own `prometheus::Registry`, so one run's numbers
/// never mix with another's.
pub struct MetricsRegistry {
    registry: Registry,
    /// Probe counter by node and result (functional / failed)
    probes: IntCounterVec,
    /// Node functional status (1=functional, 0=failed)
    node_functional: GaugeVec,
    /// Alert post counter by result (delivered / failed)
    alerts: IntCounterVec,
    /// Unix timestamp of the last completed run
    last_run: Gauge,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let probes = IntCounterVec::new(
            opts!("gpuwatch_probes_total", "Total number of node GPU probes"),
            &["node", "result"],
        )?;
        let node_functional = GaugeVec::new(
            opts!("gpuwatch_node_functional", "Whether the node GPU probe passed"),
            &["node"],
        )?;
        let alerts = IntCounterVec::new(
            opts!("gpuwatch_alerts_total", "Total number of alert posts"),
            &["result"],
        )?;
        let last_run = Gauge::with_opts(opts!(
            "gpuwatch_last_run_timestamp_seconds",
            "Unix timestamp of the last completed run"
        ))?;

        registry.register(Box::new(probes.clone()))?;
        registry.register(Box::new(node_functional.clone()))?;
        registry.register(Box::new(alerts.clone()))?;
        registry.register(Box::new(last_run.clone()))?;

        Ok(Self {
            registry,
            probes,
            node_functional,
            alerts,
            last_run,
        })
    }

    /// Record the outcome of a node probe
    pub fn record_probe(&self, node: &str, functional: bool) {
        let result = if functional { "functional" } else { "failed" };
        self.probes.with_label_values(&[node, result]).inc();
        self.node_functional
            .with_label_values(&[node])
            .set(if functional { 1.0 } else { 0.0 });
    }

    /// Record the outcome of an alert post
    pub fn record_alert(&self, delivered: bool) {
        let result = if delivered { "delivered" } else { "failed" };
        self.alerts.with_label_values(&[result]).inc();
    }

    /// Mark the run as completed now
    pub fn mark_run_complete(&self) {
        self.last_run.set(chrono::Utc::now().timestamp() as f64);
    }

    /// Unix timestamp of the last completed run, 0 if none
    pub fn last_run_timestamp(&self) -> f64 {
        self.last_run.get()
    }

    /// Render all registered metrics in the text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Write the exposition to `path` via a sibling temporary file and rename
    pub fn write_textfile(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())?;
        std::fs::rename(&tmp, path)
    }
}
