//! Outbound message queue.
//!
//! Buffers serialized frames composed while a connection is not open. The
//! queue is flushed strictly FIFO once the connection opens.

use std::collections::VecDeque;

use super::config::OverflowPolicy;

/// Result of pushing a frame onto the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame queued.
    Queued,
    /// Frame queued after evicting the oldest frame.
    EvictedOldest,
    /// Frame discarded.
    Discarded,
    /// Frame refused; the sender should be told.
    Rejected,
}

/// Per-connection FIFO of serialized frames.
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    frames: VecDeque<String>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
}

impl OutboundQueue {
    /// Creates a queue with an optional capacity and an overflow policy.
    #[must_use]
    pub fn new(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
            policy,
        }
    }

    /// Creates an unbounded queue.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, OverflowPolicy::default())
    }

    /// Appends a frame, applying the overflow policy when full.
    pub fn push(&mut self, frame: String) -> PushOutcome {
        let full = self
            .capacity
            .is_some_and(|capacity| self.frames.len() >= capacity);

        if !full {
            self.frames.push_back(frame);
            return PushOutcome::Queued;
        }

        match self.policy {
            OverflowPolicy::DropOldest => {
                self.frames.pop_front();
                self.frames.push_back(frame);
                PushOutcome::EvictedOldest
            }
            OverflowPolicy::DropNewest => PushOutcome::Discarded,
            OverflowPolicy::Reject => PushOutcome::Rejected,
        }
    }

    /// Puts a frame back at the head of the queue.
    ///
    /// Used when a write fails mid-flush; capacity is not enforced so the
    /// frame is never lost to its own retry.
    pub fn push_front(&mut self, frame: String) {
        self.frames.push_front(frame);
    }

    /// Removes and returns every queued frame in FIFO order.
    pub fn drain(&mut self) -> Vec<String> {
        self.frames.drain(..).collect()
    }

    /// Returns the number of queued frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("m{}", i)).collect()
    }

    #[test]
    fn test_queue_fifo_drain() {
        let mut queue = OutboundQueue::unbounded();
        for frame in frames(5) {
            assert_eq!(queue.push(frame), PushOutcome::Queued);
        }

        assert_eq!(queue.drain(), frames(5));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_drop_oldest() {
        let mut queue = OutboundQueue::new(Some(2), OverflowPolicy::DropOldest);
        queue.push("a".to_string());
        queue.push("b".to_string());

        assert_eq!(queue.push("c".to_string()), PushOutcome::EvictedOldest);
        assert_eq!(queue.drain(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_queue_drop_newest() {
        let mut queue = OutboundQueue::new(Some(2), OverflowPolicy::DropNewest);
        queue.push("a".to_string());
        queue.push("b".to_string());

        assert_eq!(queue.push("c".to_string()), PushOutcome::Discarded);
        assert_eq!(queue.drain(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_queue_reject() {
        let mut queue = OutboundQueue::new(Some(1), OverflowPolicy::Reject);
        queue.push("a".to_string());

        assert_eq!(queue.push("b".to_string()), PushOutcome::Rejected);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_queue_push_front_keeps_order() {
        let mut queue = OutboundQueue::new(Some(2), OverflowPolicy::Reject);
        queue.push("b".to_string());
        queue.push("c".to_string());
        queue.push_front("a".to_string());

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }
}
