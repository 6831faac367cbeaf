//! Notification service error types.

use beacon_client::ClientError;

use crate::config::ConfigError;

/// Notification service errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Error from the underlying client.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to serialize a payload.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The toast renderer failed.
    #[error("toast failed: {0}")]
    Toast(String),
}

/// Reasons an inbound notification frame is rejected.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not a JSON object.
    #[error("body is not an object")]
    NotAnObject,

    /// Neither the body nor the envelope carries an id.
    #[error("notification has no id")]
    MissingId,

    /// The body does not describe a notification.
    #[error("invalid notification payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_from_client() {
        let err: NotifyError = ClientError::SendFailed("closed".to_string()).into();
        assert!(matches!(err, NotifyError::Client(_)));
        assert_eq!(err.to_string(), "client error: send failed: closed");
    }

    #[test]
    fn test_notify_error_config_transparent() {
        let err: NotifyError = ConfigError::EmptyClientId.into();
        assert_eq!(err.to_string(), "client_id cannot be empty");
    }

    #[test]
    fn test_decode_error_display() {
        assert_eq!(DecodeError::NotAnObject.to_string(), "body is not an object");
        assert_eq!(DecodeError::MissingId.to_string(), "notification has no id");
    }
}
