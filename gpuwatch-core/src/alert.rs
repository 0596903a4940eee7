//! Alert sink abstraction
//!
//! The orchestrator only knows how to hand a message and credentials to an
//! `AlertSink`; delivery (Slack, or a recorder in tests) lives behind it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::{StateStore, StoreError, SLACK_CHANNEL_KEY, SLACK_TOKEN_KEY};

/// Credentials needed to post an alert
#[derive(Clone, PartialEq, Eq)]
pub struct AlertCredentials {
    /// Bearer token for the messaging API
    pub token: String,
    /// Target channel identifier
    pub channel: String,
}

impl AlertCredentials {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
        }
    }

    /// Load token and channel from the state store, failing on the first missing value
    pub fn load(store: &dyn StateStore) -> Result<Self, StoreError> {
        let token = store.get(SLACK_TOKEN_KEY)?;
        let channel = store.get(SLACK_CHANNEL_KEY)?;
        Ok(Self { token, channel })
    }
}

impl fmt::Debug for AlertCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertCredentials")
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Errors that can occur delivering an alert
#[derive(Debug, Error)]
pub enum AlertError {
    /// The service answered with a non-200 status
    #[error("Alert rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never got a response
    #[error("Alert transport error: {0}")]
    Transport(String),
}

/// Destination for alert messages
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Post `text` to the channel in `credentials`
    async fn post(&self, credentials: &AlertCredentials, text: &str) -> Result<(), AlertError>;
}

/// A message captured by `RecordingSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    pub channel: String,
    pub text: String,
}

/// Sink that records every post, for testing
#[derive(Default)]
pub struct RecordingSink {
    posts: RwLock<Vec<RecordedAlert>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post fail after being recorded
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All posts attempted so far, in order
    pub fn posts(&self) -> Vec<RecordedAlert> {
        self.posts.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn post(&self, credentials: &AlertCredentials, text: &str) -> Result<(), AlertError> {
        self.posts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedAlert {
                channel: credentials.channel.clone(),
                text: text.to_string(),
            });

        if self.fail.load(Ordering::SeqCst) {
            Err(AlertError::Rejected {
                status: 500,
                body: "recording sink configured to fail".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
