//! State store trait, error type and well-known keys

use std::path::PathBuf;

use thiserror::Error;

/// Key holding the "already notified" flag
pub const NOTIFIED_KEY: &str = "NOTIFIED";
/// Key holding the Slack bot token
pub const SLACK_TOKEN_KEY: &str = "SLACK_OAUTH_TOKEN";
/// Key holding the Slack channel id
pub const SLACK_CHANNEL_KEY: &str = "SLACK_CHANNEL_ID";

/// Stored value meaning an alert has already been sent
pub const NOTIFIED_TRUE: &str = "True";
/// Stored value meaning alerts may be sent
pub const NOTIFIED_FALSE: &str = "False";

/// Whether a stored flag value means "already notified"
///
/// Exact string comparison against `"True"`; `"true"`, `"1"` and friends are
/// all treated as not notified.
pub fn is_notified(value: &str) -> bool {
    value == NOTIFIED_TRUE
}

/// Errors that can occur reading or writing the state store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required value is absent or empty
    #[error("Missing configuration value: {0}")]
    Missing(String),

    /// Reading or writing the backing file failed
    #[error("Failed to access state file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted key-value store of string values
pub trait StateStore: Send + Sync {
    /// Read a named value; absent or empty values are `StoreError::Missing`
    fn get(&self, name: &str) -> Result<String, StoreError>;

    /// Write a named value, creating the store if needed and leaving other keys untouched
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_notified_exact_match() {
        assert!(is_notified("True"));
        assert!(!is_notified("False"));
        assert!(!is_notified("true"));
        assert!(!is_notified("TRUE"));
        assert!(!is_notified("1"));
        assert!(!is_notified(""));
    }

    #[test]
    fn test_missing_error_message() {
        let err = StoreError::Missing(SLACK_TOKEN_KEY.to_string());
        assert_eq!(err.to_string(), "Missing configuration value: SLACK_OAUTH_TOKEN");
    }
}
