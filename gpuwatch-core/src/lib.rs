//! gpuwatch core library
//!
//! Probes cluster nodes for GPU failures over a remote executor and raises a
//! single deduplicated alert per failure episode.

pub mod alert;
pub mod executor;
pub mod health;
pub mod metrics;
pub mod orchestrator;
pub mod store;

// Re-export common types
pub use alert::{AlertCredentials, AlertError, AlertSink};
pub use executor::{CommandOutput, RemoteExecutor, SshExecutor};
pub use health::{Node, NodeHealthCheck, Probe};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunReport, RunState};
pub use store::{EnvFileStore, StateStore, StoreError};
