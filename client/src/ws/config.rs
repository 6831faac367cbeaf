//! WebSocket configuration.
//!
//! Provides configuration options for the connection registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Default base reconnect interval in milliseconds.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

/// Default maximum reconnection attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Default backoff multiplier.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Default outbound queue capacity per connection.
pub const DEFAULT_MAX_QUEUE_LEN: usize = 1000;

/// What to do when a connection's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued message and queue the new one.
    #[default]
    DropOldest,
    /// Discard the new message.
    DropNewest,
    /// Discard the new message and return an error to the sender.
    Reject,
}

/// WebSocket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Default WebSocket URL.
    pub url: String,

    /// Base reconnect interval.
    pub reconnect_interval: Duration,

    /// Maximum reconnection attempts before a connection is given up.
    pub max_reconnect_attempts: u32,

    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,

    /// Optional ceiling on the reconnect delay (None = uncapped).
    pub max_reconnect_delay: Option<Duration>,

    /// Outbound queue capacity per connection (None = unbounded).
    pub max_queue_len: Option<usize>,

    /// Policy applied when the outbound queue is full.
    pub overflow_policy: OverflowPolicy,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_reconnect_delay: None,
            max_queue_len: Some(DEFAULT_MAX_QUEUE_LEN),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the base reconnect interval.
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Caps the reconnect delay.
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = Some(delay);
        self
    }

    /// Sets the outbound queue capacity (None = unbounded).
    #[must_use]
    pub fn with_max_queue_len(mut self, len: Option<usize>) -> Self {
        self.max_queue_len = len;
        self
    }

    /// Sets the overflow policy.
    #[must_use]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.url)?;

        if self.reconnect_interval.is_zero() {
            return Err(ConfigError::InvalidReconnectInterval);
        }

        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier);
        }

        if self.max_queue_len == Some(0) {
            return Err(ConfigError::InvalidQueueLen);
        }

        Ok(())
    }
}

/// Checks that a URL uses a WebSocket scheme.
///
/// # Errors
///
/// Returns an error for empty URLs or non `ws://`/`wss://` schemes.
pub fn validate_url(url: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::EmptyUrl);
    }

    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }

    Ok(())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Empty URL.
    #[error("url cannot be empty")]
    EmptyUrl,

    /// URL without a WebSocket scheme.
    #[error("url must start with ws:// or wss://: {0}")]
    InvalidUrl(String),

    /// Zero reconnect interval.
    #[error("reconnect_interval must be > 0")]
    InvalidReconnectInterval,

    /// Backoff multiplier below one.
    #[error("backoff_multiplier must be >= 1.0")]
    InvalidBackoffMultiplier,

    /// Zero-capacity queue.
    #[error("max_queue_len must be > 0 when set")]
    InvalidQueueLen,
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn test_config_default() {
        let config = WsConfig::default();
        assert_eq!(config.url, DEFAULT_WS_URL);
        assert_eq!(config.reconnect_interval, Duration::from_millis(5000));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.backoff_multiplier, 1.5);
        assert!(config.max_reconnect_delay.is_none());
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_config_builder() {
        let config = WsConfig::new("wss://example.com/ws")
            .with_reconnect_interval(Duration::from_millis(250))
            .with_max_reconnect_attempts(3)
            .with_backoff_multiplier(2.0)
            .with_max_reconnect_delay(Duration::from_secs(30))
            .with_max_queue_len(None)
            .with_overflow_policy(OverflowPolicy::Reject);

        assert_eq!(config.url, "wss://example.com/ws");
        assert_eq!(config.reconnect_interval, Duration::from_millis(250));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert_eq!(config.max_reconnect_delay, Some(Duration::from_secs(30)));
        assert!(config.max_queue_len.is_none());
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
    }

    #[test]
    fn test_config_validate_valid() {
        assert_ok!(WsConfig::new("wss://example.com/ws").validate());
        assert_ok!(WsConfig::new("ws://localhost:9000").validate());
    }

    #[test]
    fn test_config_validate_empty_url() {
        let err = assert_err!(WsConfig::new("").validate());
        assert_eq!(err, ConfigError::EmptyUrl);
    }

    #[test]
    fn test_config_validate_invalid_scheme() {
        assert_err!(WsConfig::new("https://example.com/ws").validate());
    }

    #[test]
    fn test_config_validate_zero_interval() {
        let config = WsConfig::default().with_reconnect_interval(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidReconnectInterval)
        );
    }

    #[test]
    fn test_config_validate_multiplier() {
        let config = WsConfig::default().with_backoff_multiplier(0.5);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBackoffMultiplier)
        );

        let config = WsConfig::default().with_backoff_multiplier(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_zero_queue() {
        let config = WsConfig::default().with_max_queue_len(Some(0));
        assert_eq!(config.validate(), Err(ConfigError::InvalidQueueLen));
    }

    #[test]
    fn test_overflow_policy_serde() {
        let json = serde_json::to_string(&OverflowPolicy::DropNewest).expect("serialize");
        assert_eq!(json, "\"drop_newest\"");
    }
}
