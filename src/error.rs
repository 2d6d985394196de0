//! Error types for Chatwire
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling. The variants mirror the
//! failure taxonomy of the send pipeline: missing credentials, rejected
//! credentials, retryable transport failures, user cancellation, and
//! undecodable persisted records.

use thiserror::Error;

/// Main error type for Chatwire operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, webhook calls, persistence, and credential
/// handling.
#[derive(Error, Debug)]
pub enum ChatwireError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credentials were obtainable; the send was aborted before any
    /// network call was made.
    #[error("Authentication required")]
    AuthRequired,

    /// The webhook rejected the supplied credentials (HTTP 401). The stored
    /// credentials have been purged and the request is not retried.
    #[error("Authentication failed: {0}")]
    AuthRejected(String),

    /// Retryable transport failure: timeout, network error, or a non-401
    /// non-2xx response. Surfaced only after the retry budget is exhausted.
    #[error("Webhook error: {0}")]
    Transient(String),

    /// The user aborted the request. Distinct from failure; callers must not
    /// present this as an error.
    #[error("Request cancelled")]
    Cancelled,

    /// A persisted record could not be decoded. The corrupt record is purged
    /// and treated as absent.
    #[error("Malformed persisted record: {0}")]
    MalformedPersisted(String),

    /// Key-value store errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Chatwire operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatwireError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_auth_required_display() {
        let error = ChatwireError::AuthRequired;
        assert_eq!(error.to_string(), "Authentication required");
    }

    #[test]
    fn test_auth_rejected_display() {
        let error = ChatwireError::AuthRejected("credentials cleared".to_string());
        assert_eq!(
            error.to_string(),
            "Authentication failed: credentials cleared"
        );
    }

    #[test]
    fn test_transient_error_display() {
        let error = ChatwireError::Transient("HTTP 503: unavailable".to_string());
        assert_eq!(error.to_string(), "Webhook error: HTTP 503: unavailable");
    }

    #[test]
    fn test_cancelled_display() {
        let error = ChatwireError::Cancelled;
        assert_eq!(error.to_string(), "Request cancelled");
    }

    #[test]
    fn test_malformed_persisted_display() {
        let error = ChatwireError::MalformedPersisted("webhook_credentials".to_string());
        assert_eq!(
            error.to_string(),
            "Malformed persisted record: webhook_credentials"
        );
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatwireError::Storage("database unavailable".to_string());
        assert_eq!(error.to_string(), "Storage error: database unavailable");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatwireError = io_error.into();
        assert!(matches!(error, ChatwireError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: ChatwireError = json_error.into();
        assert!(matches!(error, ChatwireError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: ChatwireError = yaml_error.into();
        assert!(matches!(error, ChatwireError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatwireError>();
    }
}
