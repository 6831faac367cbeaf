//! Multi-connection WebSocket client.
//!
//! This module keeps a registry of named connections. Each connection is
//! opened through a [`Connector`], reconnects with exponential backoff when
//! the transport drops, and queues outbound messages until it is open.
//! Inbound frames are parsed, tagged with the server id that delivered them
//! and dispatched to subscribers by `event_type`.
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_client::ws::{ConnectionState, WsConfig, WsService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ws = WsService::with_tungstenite(WsConfig::default())?;
//!
//!     ws.on_state_change(|server_id, state| {
//!         println!("{server_id} is now {state}");
//!     });
//!
//!     // Subscribe to notifications from any server
//!     ws.subscribe("notification", |msg| println!("{:?}", msg.body), None);
//!
//!     ws.connect("server-1", "ws://localhost:8000/ws");
//!
//!     // Queued until the connection opens
//!     ws.send("server-1", "PING", json!({}))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod memory;
pub mod messages;
pub mod metrics;
pub mod queue;
pub mod reconnect;
pub mod registry;
pub mod state;
pub mod transport;

pub use config::{ConfigError, OverflowPolicy, WsConfig};
pub use dispatcher::{Dispatcher, Listener, Subscription};
pub use memory::{MemoryConnector, MemorySocket};
pub use messages::{ChannelRegistration, InboundMessage, OutboundMessage, REGISTRATION_EVENT_TYPE};
pub use metrics::{WsMetrics, WsMetricsSnapshot};
pub use queue::{OutboundQueue, PushOutcome};
pub use reconnect::ReconnectPolicy;
pub use registry::{ListenerHandle, SendOutcome, StateListener, WsService};
pub use state::ConnectionState;
pub use transport::{Connector, EventCallback, Transport, TransportEvent, TungsteniteConnector};
