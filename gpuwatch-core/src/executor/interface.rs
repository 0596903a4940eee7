//! Remote executor trait and common types
//!
//! Defines the capability used to run a command on a named host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Captured output of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Standard output, UTF-8 decoded
    pub stdout: String,
    /// Standard error, UTF-8 decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Output with only stdout populated
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Output with only stderr populated
    pub fn err(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the remote side wrote anything to stderr
    pub fn has_error(&self) -> bool {
        !self.stderr.is_empty()
    }
}

/// Remote executor trait
///
/// Runs `command` on `host` and returns both output streams. Implementations
/// never fail: connection problems and command errors are reported through
/// `stderr`, and callers decide what a non-empty error stream means.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run a command on a remote host, blocking until it completes
    async fn run(&self, host: &str, command: &[String]) -> CommandOutput;
}
