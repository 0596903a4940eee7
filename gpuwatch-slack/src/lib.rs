//! gpuwatch Slack integration
//!
//! Delivers gpuwatch alerts through the Slack Web API.

pub mod client;
pub mod sink;

pub use client::{SlackClient, DEFAULT_API_URL};
pub use sink::SlackSink;
