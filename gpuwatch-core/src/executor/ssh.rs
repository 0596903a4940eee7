//! SSH-backed remote executor
//!
//! Spawns `ssh [options...] <host> <command...>` once per call and waits for
//! it to exit. No timeout is applied: a hung remote command blocks the caller.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandOutput, RemoteExecutor};

/// Remote executor that shells out to an ssh client
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: String,
    options: Vec<String>,
}

impl SshExecutor {
    /// Create an executor using the given ssh program and extra options
    pub fn new(program: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    /// Build the full argument vector passed to the ssh program
    pub fn build_args(&self, host: &str, command: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() + 1 + command.len());
        args.extend(self.options.iter().cloned());
        args.push(host.to_string());
        args.extend(command.iter().cloned());
        args
    }
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new("ssh", Vec::new())
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, host: &str, command: &[String]) -> CommandOutput {
        let args = self.build_args(host, command);
        debug!(host = host, program = %self.program, args = ?args, "Running remote command");

        match Command::new(&self.program).args(&args).output().await {
            Ok(output) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                warn!(host = host, program = %self.program, error = %e, "Failed to spawn remote command");
                CommandOutput::err(format!("failed to run {}: {}", self.program, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_args_default() {
        let ssh = SshExecutor::default();
        assert_eq!(
            ssh.build_args("node01", &cmd(&["nvidia-smi"])),
            cmd(&["node01", "nvidia-smi"])
        );
    }

    #[test]
    fn test_build_args_with_options() {
        let ssh = SshExecutor::new("ssh", cmd(&["-o", "BatchMode=yes"]));
        assert_eq!(
            ssh.build_args("node03", &cmd(&["sudo", "dmesg", "-T"])),
            cmd(&["-o", "BatchMode=yes", "node03", "sudo", "dmesg", "-T"])
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_both_streams() {
        // `sh -c <script> <host>` stands in for `ssh <host> <command>`
        let exec = SshExecutor::new("sh", cmd(&["-c", "echo out; echo err >&2"]));
        let output = exec.run("node01", &[]).await;
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_reported_as_stderr() {
        let exec = SshExecutor::new("/nonexistent/gpuwatch-ssh", Vec::new());
        let output = exec.run("node01", &cmd(&["nvidia-smi"])).await;
        assert!(output.stdout.is_empty());
        assert!(output.stderr.contains("failed to run /nonexistent/gpuwatch-ssh"));
    }
}
