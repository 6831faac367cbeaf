//! Notification service configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default client id sent in channel registrations.
pub const DEFAULT_CLIENT_ID: &str = "ui";

/// Default capacity of the side-channel event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default event type of the global notification subscription.
pub const DEFAULT_GLOBAL_EVENT_TYPE: &str = "notification";

/// Configuration for the notification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// How long mutations accumulate before a batch is flushed.
    ///
    /// Zero flushes on the next scheduler tick.
    pub batch_window: Duration,

    /// Client id sent when registering channel subscriptions.
    pub client_id: String,

    /// Capacity of the broadcast channel carrying side-channel events.
    pub event_capacity: usize,

    /// Event type of the global notification subscription.
    pub global_event_type: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::ZERO,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            global_event_type: DEFAULT_GLOBAL_EVENT_TYPE.to_string(),
        }
    }
}

impl NotifyConfig {
    /// Sets the batch window.
    #[must_use]
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window = window;
        self
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }

        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidEventCapacity);
        }

        if self.global_event_type.is_empty() {
            return Err(ConfigError::EmptyEventType);
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Empty client id.
    #[error("client_id cannot be empty")]
    EmptyClientId,

    /// Zero event capacity.
    #[error("event_capacity must be > 0")]
    InvalidEventCapacity,

    /// Empty global event type.
    #[error("global_event_type cannot be empty")]
    EmptyEventType,
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn test_config_default() {
        let config = NotifyConfig::default();
        assert!(config.batch_window.is_zero());
        assert_eq!(config.client_id, "ui");
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.global_event_type, "notification");
        assert_ok!(config.validate());
    }

    #[test]
    fn test_config_builder() {
        let config = NotifyConfig::default()
            .with_batch_window(Duration::from_millis(50))
            .with_client_id("desktop")
            .with_event_capacity(8);

        assert_eq!(config.batch_window, Duration::from_millis(50));
        assert_eq!(config.client_id, "desktop");
        assert_eq!(config.event_capacity, 8);
    }

    #[test]
    fn test_config_validation() {
        let err = assert_err!(NotifyConfig::default().with_client_id("").validate());
        assert_eq!(err, ConfigError::EmptyClientId);

        let err = assert_err!(NotifyConfig::default().with_event_capacity(0).validate());
        assert_eq!(err, ConfigError::InvalidEventCapacity);

        let config = NotifyConfig {
            global_event_type: String::new(),
            ..Default::default()
        };
        assert_err!(config.validate());
    }
}
