//! Client error types.
//!
//! Provides error types for connection and send operations.

use crate::ws::config::ConfigError;

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport could not be constructed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Target URL was rejected before connecting.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Failed to serialize an outbound message.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport refused an outbound frame.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Outbound queue is full and the overflow policy rejects new messages.
    #[error("outbound queue full for {server_id} ({capacity} messages)")]
    QueueFull {
        /// Server id of the connection.
        server_id: String,
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "connection failed: refused");
    }

    #[test]
    fn test_client_error_queue_full() {
        let err = ClientError::QueueFull {
            server_id: "server-1".to_string(),
            capacity: 2,
        };
        assert_eq!(
            err.to_string(),
            "outbound queue full for server-1 (2 messages)"
        );
    }

    #[test]
    fn test_client_error_from_config() {
        let err = ClientError::from(ConfigError::InvalidUrl("http://x".to_string()));
        assert_eq!(
            err.to_string(),
            "url must start with ws:// or wss://: http://x"
        );
    }

    #[test]
    fn test_client_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("nope").expect_err("invalid json");
        let err = ClientError::from(serde_err);
        assert!(err.to_string().starts_with("serialization failed"));
    }
}
