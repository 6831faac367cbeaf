//! Beacon client - multi-connection real-time messaging.
//!
//! This crate manages any number of named WebSocket connections keyed by a
//! caller-chosen server id. Each connection reconnects on its own with
//! exponential backoff, buffers outbound messages while it is not open, and
//! feeds inbound frames into a typed pub/sub dispatcher.
//!
//! # Components
//!
//! - [`WsService`]: connection registry and consumer-facing API
//! - [`ReconnectPolicy`]: backoff schedule
//! - [`OutboundQueue`]: per-connection buffer while disconnected
//! - [`Dispatcher`]: pub/sub keyed by `event_type`
//! - [`Connector`] / [`Transport`]: transport seam, with
//!   [`TungsteniteConnector`] for real sockets and [`MemoryConnector`] for
//!   in-process use
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_client::{WsConfig, WsService};
//! use serde_json::json;
//!
//! let ws = WsService::with_tungstenite(WsConfig::new("wss://rt.example/ws"))?;
//! ws.connect("server-1", "wss://rt.example/ws");
//! let sub = ws.subscribe("notification", |msg| println!("{:?}", msg.body), None);
//! ws.send("server-1", "PING", json!({}))?;
//! ```

pub mod error;
pub mod ws;

pub use error::ClientError;
pub use ws::{
    ConfigError, ConnectionState, Connector, Dispatcher, EventCallback, InboundMessage,
    ListenerHandle, MemoryConnector, MemorySocket, OutboundMessage, OutboundQueue,
    OverflowPolicy, ReconnectPolicy, SendOutcome, Subscription, Transport, TransportEvent,
    TungsteniteConnector, WsConfig, WsMetrics, WsService,
};
