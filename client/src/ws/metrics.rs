//! Client metrics tracking.
//!
//! Provides atomic counters for monitoring connections and traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for the connection registry.
#[derive(Debug)]
pub struct WsMetrics {
    /// Transports that reached `Open`.
    connections_opened: AtomicU64,

    /// Transports closed by the peer or the network.
    connections_closed: AtomicU64,

    /// Frames written to an open transport.
    messages_sent: AtomicU64,

    /// Frames buffered while disconnected.
    messages_queued: AtomicU64,

    /// Frames lost to queue overflow.
    messages_dropped: AtomicU64,

    /// Frames received.
    messages_received: AtomicU64,

    /// Frames that failed to decode.
    messages_malformed: AtomicU64,

    /// Reconnect timers scheduled.
    reconnects_scheduled: AtomicU64,

    /// Connections given up after the last attempt.
    reconnects_exhausted: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for WsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WsMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_queued: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_malformed: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            reconnects_exhausted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a transport reaching `Open`.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a transport closing.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame written.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame queued.
    pub fn record_message_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame dropped.
    pub fn record_message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame received.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame that failed to decode.
    pub fn record_message_malformed(&self) {
        self.messages_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reconnect timer being scheduled.
    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection being given up.
    pub fn record_reconnect_exhausted(&self) {
        self.reconnects_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns transports opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns transports closed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns frames written.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns frames queued.
    #[must_use]
    pub fn messages_queued(&self) -> u64 {
        self.messages_queued.load(Ordering::Relaxed)
    }

    /// Returns frames dropped.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Returns frames received.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns malformed frames.
    #[must_use]
    pub fn messages_malformed(&self) -> u64 {
        self.messages_malformed.load(Ordering::Relaxed)
    }

    /// Returns reconnect timers scheduled.
    #[must_use]
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled.load(Ordering::Relaxed)
    }

    /// Returns connections given up.
    #[must_use]
    pub fn reconnects_exhausted(&self) -> u64 {
        self.reconnects_exhausted.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> WsMetricsSnapshot {
        WsMetricsSnapshot {
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            messages_sent: self.messages_sent(),
            messages_queued: self.messages_queued(),
            messages_dropped: self.messages_dropped(),
            messages_received: self.messages_received(),
            messages_malformed: self.messages_malformed(),
            reconnects_scheduled: self.reconnects_scheduled(),
            reconnects_exhausted: self.reconnects_exhausted(),
            uptime: self.uptime(),
        }
    }
}

/// A point-in-time snapshot of client metrics.
#[derive(Debug, Clone)]
pub struct WsMetricsSnapshot {
    /// Transports opened.
    pub connections_opened: u64,
    /// Transports closed.
    pub connections_closed: u64,
    /// Frames written.
    pub messages_sent: u64,
    /// Frames queued.
    pub messages_queued: u64,
    /// Frames dropped.
    pub messages_dropped: u64,
    /// Frames received.
    pub messages_received: u64,
    /// Malformed frames.
    pub messages_malformed: u64,
    /// Reconnect timers scheduled.
    pub reconnects_scheduled: u64,
    /// Connections given up.
    pub reconnects_exhausted: u64,
    /// Uptime.
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = WsMetrics::new();
        assert_eq!(metrics.connections_opened(), 0);
        assert_eq!(metrics.messages_sent(), 0);
        assert_eq!(metrics.reconnects_scheduled(), 0);
    }

    #[test]
    fn test_metrics_record_traffic() {
        let metrics = WsMetrics::new();

        metrics.record_message_queued();
        metrics.record_message_queued();
        metrics.record_message_sent();
        metrics.record_message_dropped();
        metrics.record_message_received();
        metrics.record_message_malformed();

        assert_eq!(metrics.messages_queued(), 2);
        assert_eq!(metrics.messages_sent(), 1);
        assert_eq!(metrics.messages_dropped(), 1);
        assert_eq!(metrics.messages_received(), 1);
        assert_eq!(metrics.messages_malformed(), 1);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = WsMetrics::new();

        metrics.record_connection_opened();
        metrics.record_connection_closed();
        metrics.record_reconnect_scheduled();
        metrics.record_reconnect_exhausted();

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.connections_opened, 1);
        assert_eq!(snapshot.connections_closed, 1);
        assert_eq!(snapshot.reconnects_scheduled, 1);
        assert_eq!(snapshot.reconnects_exhausted, 1);
    }
}
