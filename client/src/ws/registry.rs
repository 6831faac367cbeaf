//! Connection registry.
//!
//! [`WsService`] owns every named connection. Each entry tracks its
//! transport, lifecycle state, reconnect attempts, pending reconnect timer
//! and outbound queue. Transport events are routed back through a callback
//! bound to one specific transport; events from a transport that has since
//! been closed or replaced are ignored.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{validate_url, WsConfig};
use super::dispatcher::{invoke_isolated, lock, Dispatcher, Subscription};
use super::messages::{InboundMessage, OutboundMessage};
use super::metrics::WsMetrics;
use super::queue::{OutboundQueue, PushOutcome};
use super::reconnect::ReconnectPolicy;
use super::state::ConnectionState;
use super::transport::{
    Connector, EventCallback, Transport, TransportEvent, TungsteniteConnector, ABNORMAL_CLOSURE,
};
use crate::error::ClientError;

/// Callback invoked on every connection state transition.
pub type StateListener = Arc<dyn Fn(&str, ConnectionState) + Send + Sync>;

/// What happened to a message passed to [`WsService::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the open transport.
    Sent,
    /// Buffered until the connection opens.
    Queued,
    /// Discarded by the overflow policy.
    Dropped,
}

struct PendingReconnect {
    token: u64,
    handle: JoinHandle<()>,
}

struct ConnectionEntry {
    url: Option<String>,
    state: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    /// Token of the transport whose events are currently accepted.
    binding: Option<u64>,
    attempts: u32,
    queue: Option<OutboundQueue>,
    reconnect: Option<PendingReconnect>,
}

impl ConnectionEntry {
    fn new() -> Self {
        Self {
            url: None,
            state: ConnectionState::Closed,
            transport: None,
            binding: None,
            attempts: 0,
            queue: None,
            reconnect: None,
        }
    }

    fn queued_len(&self) -> usize {
        self.queue.as_ref().map(OutboundQueue::len).unwrap_or(0)
    }
}

type Transitions = Vec<(String, ConnectionState)>;

/// Transitions waiting for listener delivery, in the order they happened.
#[derive(Default)]
struct Delivery {
    pending: VecDeque<(String, ConnectionState)>,
    draining: bool,
}

struct Inner {
    config: WsConfig,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    entries: Mutex<HashMap<String, ConnectionEntry>>,
    listeners: Mutex<Vec<(u64, StateListener)>>,
    delivery: Mutex<Delivery>,
    dispatcher: Dispatcher,
    metrics: Arc<WsMetrics>,
    next_token: AtomicU64,
}

/// Multi-connection real-time client.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct WsService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsService")
            .field("config", &self.inner.config)
            .field("connections", &self.connection_ids())
            .finish()
    }
}

impl WsService {
    /// Creates a service using the given connector.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WsConfig, connector: Arc<dyn Connector>) -> Result<Self, ClientError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                policy: ReconnectPolicy::from_config(&config),
                config,
                connector,
                entries: Mutex::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                delivery: Mutex::new(Delivery::default()),
                dispatcher: Dispatcher::new(),
                metrics: Arc::new(WsMetrics::new()),
                next_token: AtomicU64::new(1),
            }),
        })
    }

    /// Creates a service backed by real WebSocket connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_tungstenite(config: WsConfig) -> Result<Self, ClientError> {
        Self::new(config, Arc::new(TungsteniteConnector))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<WsMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Returns the dispatcher fed by every connection.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Opens the connection `server_id` to `url`.
    ///
    /// Does nothing while the connection is `Connecting` or `Open`. A
    /// transport that cannot be constructed is handled like an abnormal
    /// close, so the failure feeds the reconnection schedule instead of
    /// being returned.
    pub fn connect(&self, server_id: &str, url: &str) {
        let mut transitions = Transitions::new();
        {
            let mut entries = lock(&self.inner.entries);
            let entry = entries
                .entry(server_id.to_string())
                .or_insert_with(ConnectionEntry::new);

            if entry.state.is_active() {
                debug!(server_id, state = %entry.state, "connect ignored, connection active");
                return;
            }

            entry.url = Some(url.to_string());
            entry.state = ConnectionState::Connecting;
            transitions.push((server_id.to_string(), ConnectionState::Connecting));

            let binding = self.next_token();
            info!(server_id, url, "connecting");

            let opened = validate_url(url)
                .map_err(ClientError::from)
                .and_then(|()| {
                    self.inner
                        .connector
                        .open(url, self.event_callback(server_id, binding))
                });

            match opened {
                Ok(transport) => {
                    entry.transport = Some(transport);
                    entry.binding = Some(binding);
                }
                Err(e) => {
                    warn!(server_id, url, "transport construction failed: {}", e);
                    self.close_entry(
                        server_id,
                        entry,
                        ABNORMAL_CLOSURE,
                        &e.to_string(),
                        &mut transitions,
                    );
                }
            }
            self.stage_transitions(transitions);
        }
        self.deliver_transitions();
    }

    /// Opens `server_id` to the configured default URL.
    pub fn connect_default(&self, server_id: &str) {
        let url = self.inner.config.url.clone();
        self.connect(server_id, &url);
    }

    /// Closes and forgets the connection `server_id`.
    ///
    /// Cancels any pending reconnect, resets the attempt counter and drops
    /// queued messages. Events still in flight from the closed transport are
    /// ignored. Unknown ids are a no-op.
    pub fn disconnect(&self, server_id: &str) {
        let mut transitions = Transitions::new();
        {
            let mut entries = lock(&self.inner.entries);
            let Some(mut entry) = entries.remove(server_id) else {
                return;
            };

            if let Some(pending) = entry.reconnect.take() {
                pending.handle.abort();
            }
            entry.binding = None;

            if let Some(mut transport) = entry.transport.take() {
                transitions.push((server_id.to_string(), ConnectionState::Closing));
                transport.close();
            }
            if entry.state != ConnectionState::Closed || !transitions.is_empty() {
                transitions.push((server_id.to_string(), ConnectionState::Closed));
            }

            info!(
                server_id,
                dropped = entry.queued_len(),
                "disconnected"
            );
            self.stage_transitions(transitions);
        }
        self.deliver_transitions();
    }

    /// Disconnects every known connection.
    pub fn disconnect_all(&self) {
        for server_id in self.connection_ids() {
            self.disconnect(&server_id);
        }
    }

    /// Sends `{type, payload, timestamp}` on `server_id`.
    ///
    /// Writes immediately when the connection is open, otherwise queues the
    /// frame until it opens.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized, or if the queue
    /// is full under [`OverflowPolicy::Reject`](super::config::OverflowPolicy::Reject).
    pub fn send(&self, server_id: &str, kind: &str, payload: Value) -> Result<SendOutcome, ClientError> {
        let text = OutboundMessage::new(kind, payload).to_text()?;

        let mut entries = lock(&self.inner.entries);
        let entry = entries
            .entry(server_id.to_string())
            .or_insert_with(ConnectionEntry::new);

        if entry.state.is_open() {
            if let Some(transport) = entry.transport.as_mut() {
                match transport.send(text.clone()) {
                    Ok(()) => {
                        self.inner.metrics.record_message_sent();
                        debug!(server_id, kind, "message sent");
                        return Ok(SendOutcome::Sent);
                    }
                    Err(e) => warn!(server_id, kind, "write failed, queuing message: {}", e),
                }
            }
        }

        self.enqueue(server_id, entry, text)
    }

    /// Returns the state of `server_id`, `Closed` when unknown.
    #[must_use]
    pub fn state(&self, server_id: &str) -> ConnectionState {
        lock(&self.inner.entries)
            .get(server_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Registers a listener for every state transition of every connection.
    ///
    /// Listeners run synchronously in registration order.
    pub fn on_state_change<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&str, ConnectionState) + Send + Sync + 'static,
    {
        let id = self.next_token();
        lock(&self.inner.listeners).push((id, Arc::new(listener)));

        ListenerHandle {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Subscribes to inbound messages of `event_type`, optionally from one
    /// connection only.
    pub fn subscribe<F>(&self, event_type: &str, listener: F, server_id: Option<&str>) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(event_type, listener, server_id)
    }

    /// Returns every known server id.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<String> {
        lock(&self.inner.entries).keys().cloned().collect()
    }

    /// Returns the number of messages queued for `server_id`.
    #[must_use]
    pub fn queued_len(&self, server_id: &str) -> usize {
        lock(&self.inner.entries)
            .get(server_id)
            .map(ConnectionEntry::queued_len)
            .unwrap_or(0)
    }

    /// Returns the reconnect attempts made since the last successful open.
    #[must_use]
    pub fn attempts(&self, server_id: &str) -> u32 {
        lock(&self.inner.entries)
            .get(server_id)
            .map(|entry| entry.attempts)
            .unwrap_or(0)
    }

    /// Returns true if a reconnect timer is pending for `server_id`.
    #[must_use]
    pub fn has_pending_reconnect(&self, server_id: &str) -> bool {
        lock(&self.inner.entries)
            .get(server_id)
            .is_some_and(|entry| entry.reconnect.is_some())
    }

    fn next_token(&self) -> u64 {
        self.inner.next_token.fetch_add(1, Ordering::Relaxed)
    }

    fn event_callback(&self, server_id: &str, binding: u64) -> EventCallback {
        let inner = Arc::downgrade(&self.inner);
        let server_id = server_id.to_string();
        Arc::new(move |event| {
            if let Some(inner) = inner.upgrade() {
                WsService { inner }.handle_event(&server_id, binding, event);
            }
        })
    }

    fn handle_event(&self, server_id: &str, binding: u64, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.handle_open(server_id, binding),
            TransportEvent::Message(text) => {
                if self.is_bound(server_id, binding) {
                    self.handle_message(server_id, &text);
                } else {
                    debug!(server_id, "frame from retired transport ignored");
                }
            }
            TransportEvent::Close { code, reason } => {
                self.handle_close(server_id, binding, code, &reason);
            }
            TransportEvent::Error(reason) => {
                warn!(server_id, "transport error: {}", reason);
                self.handle_close(server_id, binding, ABNORMAL_CLOSURE, &reason);
            }
        }
    }

    fn is_bound(&self, server_id: &str, binding: u64) -> bool {
        lock(&self.inner.entries)
            .get(server_id)
            .is_some_and(|entry| entry.binding == Some(binding))
    }

    fn handle_open(&self, server_id: &str, binding: u64) {
        let mut transitions = Transitions::new();
        {
            let mut entries = lock(&self.inner.entries);
            let Some(entry) = entries
                .get_mut(server_id)
                .filter(|entry| entry.binding == Some(binding))
            else {
                debug!(server_id, "open from retired transport ignored");
                return;
            };

            entry.state = ConnectionState::Open;
            entry.attempts = 0;
            transitions.push((server_id.to_string(), ConnectionState::Open));
            self.inner.metrics.record_connection_opened();

            let frames = entry
                .queue
                .take()
                .map(|mut queue| queue.drain())
                .unwrap_or_default();
            let total = frames.len();
            let mut flushed = 0;

            if let Some(transport) = entry.transport.as_mut() {
                let mut frames = frames.into_iter();
                while let Some(frame) = frames.next() {
                    if let Err(e) = transport.send(frame.clone()) {
                        warn!(server_id, "flush interrupted: {}", e);
                        let queue = entry.queue.get_or_insert_with(|| {
                            OutboundQueue::new(
                                self.inner.config.max_queue_len,
                                self.inner.config.overflow_policy,
                            )
                        });
                        let remaining: Vec<String> =
                            std::iter::once(frame).chain(frames.by_ref()).collect();
                        for frame in remaining.into_iter().rev() {
                            queue.push_front(frame);
                        }
                        break;
                    }
                    flushed += 1;
                    self.inner.metrics.record_message_sent();
                }
            }

            info!(server_id, flushed, queued = total, "connection open");
            self.stage_transitions(transitions);
        }
        self.deliver_transitions();
    }

    fn handle_message(&self, server_id: &str, text: &str) {
        self.inner.metrics.record_message_received();

        match InboundMessage::parse(text, server_id) {
            Ok(message) => {
                let delivered = self.inner.dispatcher.dispatch(&message);
                debug!(
                    server_id,
                    event_type = %message.event_type,
                    delivered,
                    "message dispatched"
                );
            }
            Err(e) => {
                self.inner.metrics.record_message_malformed();
                warn!(server_id, "dropping malformed frame: {}", e);
            }
        }
    }

    fn handle_close(&self, server_id: &str, binding: u64, code: u16, reason: &str) {
        let mut transitions = Transitions::new();
        {
            let mut entries = lock(&self.inner.entries);
            let Some(entry) = entries
                .get_mut(server_id)
                .filter(|entry| entry.binding == Some(binding))
            else {
                debug!(server_id, code, "close from retired transport ignored");
                return;
            };

            self.close_entry(server_id, entry, code, reason, &mut transitions);
            self.stage_transitions(transitions);
        }
        self.deliver_transitions();
    }

    /// Marks an entry closed and hands it to the reconnection schedule.
    fn close_entry(
        &self,
        server_id: &str,
        entry: &mut ConnectionEntry,
        code: u16,
        reason: &str,
        transitions: &mut Transitions,
    ) {
        entry.binding = None;
        entry.transport = None;
        entry.state = ConnectionState::Closed;
        transitions.push((server_id.to_string(), ConnectionState::Closed));
        self.inner.metrics.record_connection_closed();
        info!(server_id, code, reason, "connection closed");

        if let Some(url) = entry.url.clone() {
            self.schedule_reconnect(server_id, entry, url);
        }
    }

    fn schedule_reconnect(&self, server_id: &str, entry: &mut ConnectionEntry, url: String) {
        if entry.reconnect.is_some() {
            debug!(server_id, "reconnect already pending");
            return;
        }

        if self.inner.policy.is_exhausted(entry.attempts) {
            self.inner.metrics.record_reconnect_exhausted();
            error!(
                server_id,
                attempts = entry.attempts,
                "max reconnect attempts reached, giving up"
            );
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(server_id, "no async runtime, reconnect not scheduled");
            return;
        };

        entry.attempts += 1;
        let delay = self.inner.policy.delay_for_attempt(entry.attempts);
        let token = self.next_token();
        let inner = Arc::downgrade(&self.inner);
        let id = server_id.to_string();

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                WsService { inner }.reconnect_due(&id, token, &url);
            }
        });

        entry.reconnect = Some(PendingReconnect { token, handle });
        self.inner.metrics.record_reconnect_scheduled();
        info!(
            server_id,
            attempt = entry.attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnect scheduled"
        );
    }

    fn reconnect_due(&self, server_id: &str, token: u64, url: &str) {
        {
            let mut entries = lock(&self.inner.entries);
            let Some(entry) = entries.get_mut(server_id) else {
                return;
            };
            if entry.reconnect.as_ref().map(|pending| pending.token) != Some(token) {
                return;
            }
            entry.reconnect = None;
        }

        debug!(server_id, "reconnect timer fired");
        self.connect(server_id, url);
    }

    fn enqueue(
        &self,
        server_id: &str,
        entry: &mut ConnectionEntry,
        text: String,
    ) -> Result<SendOutcome, ClientError> {
        let config = &self.inner.config;
        let queue = entry
            .queue
            .get_or_insert_with(|| OutboundQueue::new(config.max_queue_len, config.overflow_policy));

        match queue.push(text) {
            PushOutcome::Queued => {
                self.inner.metrics.record_message_queued();
                debug!(server_id, queued = queue.len(), "connection not open, message queued");
                Ok(SendOutcome::Queued)
            }
            PushOutcome::EvictedOldest => {
                self.inner.metrics.record_message_queued();
                self.inner.metrics.record_message_dropped();
                warn!(server_id, "outbound queue full, dropped oldest message");
                Ok(SendOutcome::Queued)
            }
            PushOutcome::Discarded => {
                self.inner.metrics.record_message_dropped();
                warn!(server_id, "outbound queue full, dropped new message");
                Ok(SendOutcome::Dropped)
            }
            PushOutcome::Rejected => {
                self.inner.metrics.record_message_dropped();
                warn!(server_id, "outbound queue full, message rejected");
                Err(ClientError::QueueFull {
                    server_id: server_id.to_string(),
                    capacity: queue.capacity().unwrap_or(queue.len()),
                })
            }
        }
    }

    /// Queues transitions for delivery. Called with the entries lock held so
    /// the queue order matches the order the states were written.
    fn stage_transitions(&self, transitions: Transitions) {
        if transitions.is_empty() {
            return;
        }
        lock(&self.inner.delivery).pending.extend(transitions);
    }

    /// Delivers queued transitions to the listeners.
    ///
    /// One caller drains at a time. A transition staged while another caller
    /// is draining, including one staged from inside a listener, is delivered
    /// by that caller after the transitions queued before it.
    fn deliver_transitions(&self) {
        {
            let mut delivery = lock(&self.inner.delivery);
            if delivery.draining || delivery.pending.is_empty() {
                return;
            }
            delivery.draining = true;
        }

        loop {
            let (server_id, state) = {
                let mut delivery = lock(&self.inner.delivery);
                match delivery.pending.pop_front() {
                    Some(transition) => transition,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };

            let listeners: Vec<StateListener> = lock(&self.inner.listeners)
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();

            debug!(server_id = %server_id, %state, "state changed");
            for listener in &listeners {
                if !invoke_isolated(|| listener(&server_id, state)) {
                    error!(server_id = %server_id, %state, "state listener panicked");
                }
            }
        }
    }
}

/// Handle to a state-change listener.
#[derive(Debug)]
pub struct ListenerHandle {
    inner: Weak<Inner>,
    id: u64,
}

impl ListenerHandle {
    /// Removes the listener.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}
