//! Mock executor implementation for testing

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CommandOutput, RemoteExecutor};

/// A single recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub host: String,
    pub command: Vec<String>,
}

/// Mock executor for testing
///
/// Returns scripted output per host (and optionally per command), healthy
/// empty output otherwise, and records every call in order.
#[derive(Default)]
pub struct MockExecutor {
    host_outputs: RwLock<HashMap<String, CommandOutput>>,
    command_outputs: RwLock<HashMap<(String, String), CommandOutput>>,
    calls: RwLock<Vec<MockCall>>,
}

impl MockExecutor {
    /// Create a mock where every host is healthy
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the output returned for any command on `host`
    pub fn set_output(&self, host: &str, output: CommandOutput) {
        let mut outputs = self.host_outputs.write().unwrap_or_else(|e| e.into_inner());
        outputs.insert(host.to_string(), output);
    }

    /// Script the output returned for a command whose first word is `program`
    pub fn set_command_output(&self, host: &str, program: &str, output: CommandOutput) {
        let mut outputs = self
            .command_outputs
            .write()
            .unwrap_or_else(|e| e.into_inner());
        outputs.insert((host.to_string(), program.to_string()), output);
    }

    /// Make `host` report `stderr` on its error stream
    pub fn fail_host(&self, host: &str, stderr: &str) {
        self.set_output(host, CommandOutput::err(stderr));
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn run(&self, host: &str, command: &[String]) -> CommandOutput {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockCall {
                host: host.to_string(),
                command: command.to_vec(),
            });

        if let Some(program) = command.first() {
            let outputs = self.command_outputs.read().unwrap_or_else(|e| e.into_inner());
            if let Some(output) = outputs.get(&(host.to_string(), program.clone())) {
                return output.clone();
            }
        }

        let outputs = self.host_outputs.read().unwrap_or_else(|e| e.into_inner());
        outputs
            .get(host)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("GPU 0: NVIDIA A100-SXM4-80GB\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nvidia_smi() -> Vec<String> {
        vec!["nvidia-smi".to_string()]
    }

    #[test]
    fn test_mock_healthy_by_default() {
        let mock = MockExecutor::new();
        let output = tokio_test::block_on(mock.run("node01", &nvidia_smi()));
        assert!(!output.has_error());
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_mock_failing_host() {
        let mock = MockExecutor::new();
        mock.fail_host("node02", "Unable to determine the device handle for GPU0");

        let ok = tokio_test::block_on(mock.run("node01", &nvidia_smi()));
        let bad = tokio_test::block_on(mock.run("node02", &nvidia_smi()));
        assert!(!ok.has_error());
        assert!(bad.stderr.contains("device handle"));

        let hosts: Vec<_> = mock.calls().into_iter().map(|c| c.host).collect();
        assert_eq!(hosts, vec!["node01", "node02"]);
    }

    #[test]
    fn test_mock_command_output_takes_precedence() {
        let mock = MockExecutor::new();
        mock.fail_host("node04", "GPU has fallen off the bus");
        mock.set_command_output("node04", "dmesg", CommandOutput::ok("NVRM: Xid 79"));

        let dmesg = vec!["dmesg".to_string()];
        let output = tokio_test::block_on(mock.run("node04", &dmesg));
        assert_eq!(output.stdout, "NVRM: Xid 79");
        assert!(!output.has_error());
    }
}
