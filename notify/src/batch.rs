//! Pending update queue.
//!
//! Mutations accumulate here between flushes. The queue tells its caller
//! when a flush has to be scheduled, and does so once per pending batch.

use serde::{Deserialize, Serialize};

use crate::types::Notification;

/// Kind of mutation carried by a batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOp {
    /// Notification created.
    Add,
    /// Notification changed.
    Update,
    /// Notification removed.
    Delete,
}

/// One mutation with the record as it was right after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Mutation kind.
    #[serde(rename = "type")]
    pub op: BatchOp,
    /// Record snapshot.
    pub notification: Notification,
}

impl BatchEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(op: BatchOp, notification: Notification) -> Self {
        Self { op, notification }
    }
}

/// Ordered entries waiting for the next flush.
#[derive(Debug, Default)]
pub struct BatchQueue {
    entries: Vec<BatchEntry>,
    scheduled: bool,
}

impl BatchQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    ///
    /// Returns true when the caller must schedule a flush.
    pub fn push(&mut self, entry: BatchEntry) -> bool {
        self.entries.push(entry);
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    /// Takes every entry in order and clears the in-flight guard.
    pub fn take(&mut self) -> Vec<BatchEntry> {
        self.scheduled = false;
        std::mem::take(&mut self.entries)
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true while a flush is scheduled.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::NotificationOptions;

    fn entry(op: BatchOp, id: &str) -> BatchEntry {
        BatchEntry::new(
            op,
            Notification::from_options(id.to_string(), NotificationOptions::new("m"), Utc::now()),
        )
    }

    #[test]
    fn test_push_schedules_once() {
        let mut queue = BatchQueue::new();

        assert!(queue.push(entry(BatchOp::Add, "a")));
        assert!(!queue.push(entry(BatchOp::Update, "a")));
        assert!(queue.is_scheduled());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_take_preserves_order_and_resets() {
        let mut queue = BatchQueue::new();
        queue.push(entry(BatchOp::Add, "a"));
        queue.push(entry(BatchOp::Add, "b"));
        queue.push(entry(BatchOp::Delete, "a"));

        let taken = queue.take();
        let ops: Vec<_> = taken
            .iter()
            .map(|e| (e.op, e.notification.id.as_str()))
            .collect();

        assert_eq!(
            ops,
            vec![(BatchOp::Add, "a"), (BatchOp::Add, "b"), (BatchOp::Delete, "a")]
        );
        assert!(queue.is_empty());
        assert!(!queue.is_scheduled());
        assert!(queue.push(entry(BatchOp::Add, "c")));
    }

    #[test]
    fn test_entry_serializes_type() {
        let value = serde_json::to_value(entry(BatchOp::Update, "a")).expect("serialize");
        assert_eq!(value["type"], "update");
        assert_eq!(value["notification"]["id"], "a");
    }
}
