//! Typed pub/sub dispatch of inbound messages.
//!
//! Consumers subscribe to an `event_type`, optionally scoped to one server
//! id. Every inbound message is fanned out to the listeners registered for
//! its type. Listeners are isolated from each other: a panicking listener is
//! logged and its siblings still run.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, error};

use super::messages::InboundMessage;

/// Callback invoked for each matching inbound message.
pub type Listener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(u64, Listener)>>,
}

/// Fan-out dispatcher keyed by message type.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("types", &self.subscribed_types())
            .finish()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener to a message type.
    ///
    /// When `server_id` is given, messages delivered by any other connection
    /// are filtered out before the listener runs.
    pub fn subscribe<F>(&self, event_type: &str, listener: F, server_id: Option<&str>) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let wrapped: Listener = match server_id {
            Some(origin) => {
                let origin = origin.to_string();
                Arc::new(move |msg: &InboundMessage| {
                    if msg.server_id == origin {
                        listener(msg);
                    }
                })
            }
            None => Arc::new(listener),
        };

        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .entry(event_type.to_string())
            .or_default()
            .push((id, wrapped));

        debug!(event_type, id, server_id = ?server_id, "listener subscribed");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event_type: event_type.to_string(),
            id,
        }
    }

    /// Delivers a message to every listener of its type.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .get(&message.event_type)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for listener in listeners {
            if invoke_isolated(|| listener(message)) {
                delivered += 1;
            } else {
                error!(
                    event_type = %message.event_type,
                    server_id = %message.server_id,
                    "listener panicked during dispatch"
                );
            }
        }
        delivered
    }

    /// Returns the number of listeners for a type.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        lock(&self.registry)
            .listeners
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns every type with at least one listener.
    #[must_use]
    pub fn subscribed_types(&self) -> Vec<String> {
        lock(&self.registry).listeners.keys().cloned().collect()
    }
}

/// Handle to one listener registration.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event_type: String,
    id: u64,
}

impl Subscription {
    /// Returns the subscribed message type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Removes exactly this listener; other listeners of the same type stay.
    pub fn unsubscribe(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        let mut registry = lock(&registry);
        if let Some(entries) = registry.listeners.get_mut(&self.event_type) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                registry.listeners.remove(&self.event_type);
            }
        }
        debug!(event_type = %self.event_type, id = self.id, "listener unsubscribed");
    }
}

/// Runs a callback, converting a panic into `false`.
pub(crate) fn invoke_isolated(f: impl FnOnce()) -> bool {
    panic::catch_unwind(AssertUnwindSafe(f)).is_ok()
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;

    use super::*;

    fn message(event_type: &str, server_id: &str) -> InboundMessage {
        InboundMessage {
            id: "m1".to_string(),
            event_type: event_type.to_string(),
            timestamp: String::new(),
            message: String::new(),
            body: Value::Null,
            server_id: server_id.to_string(),
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&InboundMessage) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &InboundMessage| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_by_type() {
        let dispatcher = Dispatcher::new();
        let (hits, listener) = counter();
        let _sub = dispatcher.subscribe("notification", listener, None);

        assert_eq!(dispatcher.dispatch(&message("notification", "a")), 1);
        assert_eq!(dispatcher.dispatch(&message("other", "a")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_server_filter() {
        let dispatcher = Dispatcher::new();
        let (hits, listener) = counter();
        let _sub = dispatcher.subscribe("notification", listener, Some("server-1"));

        dispatcher.dispatch(&message("notification", "server-2"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(&message("notification", "server-1"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_isolated() {
        let dispatcher = Dispatcher::new();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();
        let first_sub = dispatcher.subscribe("x", first, None);
        let _second_sub = dispatcher.subscribe("x", second, None);

        first_sub.unsubscribe();
        dispatcher.dispatch(&message("x", "a"));

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.listener_count("x"), 1);
    }

    #[test]
    fn test_same_closure_subscribed_twice_is_two_listeners() {
        let dispatcher = Dispatcher::new();
        let (hits, listener) = counter();
        let listener = Arc::new(listener);
        let l1 = Arc::clone(&listener);
        let l2 = Arc::clone(&listener);
        let sub1 = dispatcher.subscribe("x", move |m| l1(m), None);
        let _sub2 = dispatcher.subscribe("x", move |m| l2(m), None);

        dispatcher.dispatch(&message("x", "a"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        sub1.unsubscribe();
        dispatcher.dispatch(&message("x", "a"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_empty_type_removed() {
        let dispatcher = Dispatcher::new();
        let (_, listener) = counter();
        let sub = dispatcher.subscribe("x", listener, None);
        assert_eq!(dispatcher.subscribed_types(), vec!["x".to_string()]);

        sub.unsubscribe();
        assert!(dispatcher.subscribed_types().is_empty());
        assert_eq!(dispatcher.listener_count("x"), 0);
    }

    #[test]
    fn test_panicking_listener_isolated() {
        let dispatcher = Dispatcher::new();
        let (hits, listener) = counter();
        let _bad = dispatcher.subscribe("x", |_| panic!("listener failure"), None);
        let _good = dispatcher.subscribe("x", listener, None);

        let delivered = dispatcher.dispatch(&message("x", "a"));

        assert_eq!(delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_subscribe_during_dispatch() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        let _sub = dispatcher.subscribe(
            "x",
            move |_| {
                let _nested = inner.subscribe("y", |_| {}, None);
            },
            None,
        );

        dispatcher.dispatch(&message("x", "a"));
        assert_eq!(dispatcher.listener_count("y"), 1);
    }

    #[test]
    fn test_unsubscribe_after_dispatcher_dropped() {
        let dispatcher = Dispatcher::new();
        let sub = dispatcher.subscribe("x", |_| {}, None);
        drop(dispatcher);
        sub.unsubscribe();
    }
}
