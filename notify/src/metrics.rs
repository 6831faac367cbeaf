//! Notification service metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the notification service.
#[derive(Debug, Default)]
pub struct NotifyMetrics {
    created: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
    toasts_shown: AtomicU64,
    toasts_failed: AtomicU64,
    batches_flushed: AtomicU64,
    modal_events: AtomicU64,
    inbound_rejected: AtomicU64,
}

impl NotifyMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a notification created.
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a notification updated.
    pub fn record_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a notification deleted.
    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a toast shown.
    pub fn record_toast_shown(&self) {
        self.toasts_shown.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a toast the renderer failed to show.
    pub fn record_toast_failed(&self) {
        self.toasts_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a batch flushed.
    pub fn record_batch_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a modal event.
    pub fn record_modal_event(&self) {
        self.modal_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound frame rejected by the decoder.
    pub fn record_inbound_rejected(&self) {
        self.inbound_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> NotifyMetricsSnapshot {
        NotifyMetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            toasts_shown: self.toasts_shown.load(Ordering::Relaxed),
            toasts_failed: self.toasts_failed.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            modal_events: self.modal_events.load(Ordering::Relaxed),
            inbound_rejected: self.inbound_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of notification metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyMetricsSnapshot {
    /// Notifications created.
    pub created: u64,
    /// Notifications updated.
    pub updated: u64,
    /// Notifications deleted.
    pub deleted: u64,
    /// Toasts shown.
    pub toasts_shown: u64,
    /// Toasts that failed.
    pub toasts_failed: u64,
    /// Batches flushed.
    pub batches_flushed: u64,
    /// Modal events raised.
    pub modal_events: u64,
    /// Inbound frames rejected.
    pub inbound_rejected: u64,
}
