//! Reconnection backoff.
//!
//! The n-th reconnect attempt (1-based) waits
//! `reconnect_interval * backoff_multiplier^(n-1)`, optionally capped. Once
//! the attempt counter reaches `max_reconnect_attempts` the connection is
//! given up until an explicit `connect`.

use std::time::Duration;

use super::config::WsConfig;

/// Reconnection schedule derived from [`WsConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    base: Duration,
    multiplier: f64,
    max_attempts: u32,
    max_delay: Option<Duration>,
}

impl ReconnectPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(
        base: Duration,
        multiplier: f64,
        max_attempts: u32,
        max_delay: Option<Duration>,
    ) -> Self {
        Self {
            base,
            multiplier,
            max_attempts,
            max_delay,
        }
    }

    /// Builds the policy from a configuration.
    #[must_use]
    pub fn from_config(config: &WsConfig) -> Self {
        Self::new(
            config.reconnect_interval,
            config.backoff_multiplier,
            config.max_reconnect_attempts,
            config.max_reconnect_delay,
        )
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if no further attempt may be scheduled.
    #[must_use]
    pub const fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Returns the delay before the given 1-based attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&WsConfig::default())
    }
}
