//! Slack Web API client
//!
//! Thin wrapper around `chat.postMessage`.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use gpuwatch_core::alert::AlertError;

/// Default `chat.postMessage` endpoint
pub const DEFAULT_API_URL: &str = "https://slack.com/api/chat.postMessage";

/// Body returned by the Slack Web API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackReply {
    /// Whether Slack accepted the call
    #[serde(default)]
    pub ok: bool,
    /// Slack error code when `ok` is false
    #[serde(default)]
    pub error: Option<String>,
}

impl SlackReply {
    /// Slack's error code for a delivered but unaccepted call
    pub fn warning(&self) -> Option<&str> {
        if self.ok {
            None
        } else {
            Some(self.error.as_deref().unwrap_or("unknown"))
        }
    }
}

/// Slack client wrapper
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: Client,
    api_url: String,
}

impl SlackClient {
    /// Create a client posting to the given endpoint
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into(),
        }
    }

    /// Endpoint this client posts to
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Post `text` to `channel`
    ///
    /// HTTP 200 is success, whatever the body says; the parsed body is
    /// returned so callers can surface Slack-level errors.
    pub async fn post_message(
        &self,
        token: &str,
        channel: &str,
        text: &str,
    ) -> Result<SlackReply, AlertError> {
        let payload = json!({
            "channel": channel,
            "text": text,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AlertError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AlertError::Transport(e.to_string()))?;
        debug!(status = %status, body = %body, "Slack API response");

        if status != StatusCode::OK {
            return Err(AlertError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

impl Default for SlackClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
