//! `AlertSink` implementation posting to Slack

use async_trait::async_trait;
use tracing::{info, warn};

use gpuwatch_core::alert::{AlertCredentials, AlertError, AlertSink};

use super::client::SlackClient;

/// Posts alerts to a Slack channel, logging the outcome of every message
pub struct SlackSink {
    client: SlackClient,
}

impl SlackSink {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSink for SlackSink {
    async fn post(&self, credentials: &AlertCredentials, text: &str) -> Result<(), AlertError> {
        match self
            .client
            .post_message(&credentials.token, &credentials.channel, text)
            .await
        {
            Ok(reply) => {
                match reply.warning() {
                    Some(error) => warn!(
                        channel = %credentials.channel,
                        error = error,
                        "Slack accepted the request but reported an error"
                    ),
                    None => info!(channel = %credentials.channel, "Message sent successfully"),
                }
                Ok(())
            }
            Err(e) => {
                warn!(channel = %credentials.channel, error = %e, "Failed to send message");
                Err(e)
            }
        }
    }
}
