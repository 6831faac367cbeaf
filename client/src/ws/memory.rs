//! In-process transport.
//!
//! [`MemoryConnector`] records every transport it opens. Nothing happens on
//! its own: the owner drives each [`MemorySocket`] by emitting events, and
//! reads back the frames the registry wrote. Useful for embedding the
//! registry without a network and for exercising reconnection behaviour.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::dispatcher::lock;
use super::transport::{Connector, EventCallback, Transport, TransportEvent, ABNORMAL_CLOSURE};
use crate::error::ClientError;

#[derive(Default)]
struct ConnectorState {
    sockets: Vec<MemorySocket>,
    refuse: bool,
}

/// Connector that hands out in-memory sockets.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("opened", &self.opened())
            .finish()
    }
}

impl MemoryConnector {
    /// Creates a connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `open` calls fail synchronously.
    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.state).refuse = refuse;
    }

    /// Returns how many transports have been opened.
    #[must_use]
    pub fn opened(&self) -> usize {
        lock(&self.state).sockets.len()
    }

    /// Returns the socket opened at `index`.
    #[must_use]
    pub fn socket(&self, index: usize) -> Option<MemorySocket> {
        lock(&self.state).sockets.get(index).cloned()
    }

    /// Returns the most recently opened socket.
    #[must_use]
    pub fn last_socket(&self) -> Option<MemorySocket> {
        lock(&self.state).sockets.last().cloned()
    }
}

impl Connector for MemoryConnector {
    fn open(&self, url: &str, on_event: EventCallback) -> Result<Box<dyn Transport>, ClientError> {
        let mut state = lock(&self.state);
        if state.refuse {
            return Err(ClientError::Connection(format!("refused: {}", url)));
        }

        let socket = MemorySocket {
            url: url.to_string(),
            on_event,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let transport = MemoryTransport {
            sent: Arc::clone(&socket.sent),
            closed: Arc::clone(&socket.closed),
        };
        state.sockets.push(socket);

        Ok(Box::new(transport))
    }
}

/// The far end of an in-memory transport.
#[derive(Clone)]
pub struct MemorySocket {
    url: String,
    on_event: EventCallback,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for MemorySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySocket")
            .field("url", &self.url)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl MemorySocket {
    /// Returns the URL the socket was opened with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers an event to the registry.
    pub fn emit(&self, event: TransportEvent) {
        (self.on_event)(event);
    }

    /// Reports the transport as open.
    pub fn open(&self) {
        self.emit(TransportEvent::Open);
    }

    /// Delivers a text frame.
    pub fn receive(&self, text: impl Into<String>) {
        self.emit(TransportEvent::Message(text.into()));
    }

    /// Delivers a JSON frame.
    pub fn receive_json(&self, value: &Value) {
        self.receive(value.to_string());
    }

    /// Reports an abnormal close.
    pub fn drop_connection(&self) {
        self.emit(TransportEvent::Close {
            code: ABNORMAL_CLOSURE,
            reason: "dropped".to_string(),
        });
    }

    /// Returns the frames written by the registry, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Returns the written frames parsed as JSON.
    #[must_use]
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    /// Returns true once the registry closed the transport.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MemoryTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for MemoryTransport {
    fn send(&mut self, text: String) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::SendFailed("transport closed".to_string()));
        }
        lock(&self.sent).push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_memory_connector_records_sockets() {
        let connector = MemoryConnector::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);

        let mut transport = connector
            .open(
                "ws://a",
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .expect("transport");

        assert_eq!(connector.opened(), 1);
        let socket = connector.last_socket().expect("socket");
        assert_eq!(socket.url(), "ws://a");

        transport.send("hello".to_string()).expect("send");
        assert_eq!(socket.sent(), vec!["hello".to_string()]);

        socket.open();
        assert_eq!(events.load(Ordering::SeqCst), 1);

        transport.close();
        assert!(socket.is_closed());
        assert!(transport.send("late".to_string()).is_err());
    }

    #[test]
    fn test_memory_connector_refuse() {
        let connector = MemoryConnector::new();
        connector.refuse_connections(true);

        assert!(connector.open("ws://a", Arc::new(|_| {})).is_err());
        assert_eq!(connector.opened(), 0);
    }
}
