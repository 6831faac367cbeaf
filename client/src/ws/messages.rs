//! WebSocket message types.
//!
//! Defines the wire records exchanged with real-time servers. Every frame
//! is a single JSON object.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Event type used for channel registration frames.
pub const REGISTRATION_EVENT_TYPE: &str = "global";

/// Client-to-server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary payload.
    pub payload: Value,
    /// Creation time in milliseconds since epoch.
    pub timestamp: i64,
}

impl OutboundMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Serializes the message to a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_text(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of a channel registration frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRegistration {
    /// Client identifier.
    pub client_id: String,
    /// Channels to register.
    pub subscriptions: Vec<String>,
}

impl ChannelRegistration {
    /// Creates a registration for one channel.
    #[must_use]
    pub fn single(client_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            subscriptions: vec![channel.into()],
        }
    }
}

/// Server-to-client frame, tagged in memory with its origin connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message id.
    #[serde(default)]
    pub id: String,
    /// Dispatch key.
    pub event_type: String,
    /// Server timestamp, kept verbatim.
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Event body.
    #[serde(default)]
    pub body: Value,
    /// Server id of the connection that delivered the frame.
    #[serde(skip)]
    pub server_id: String,
}

impl InboundMessage {
    /// Parses a text frame and tags it with the originating server id.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid inbound record.
    pub fn parse(text: &str, server_id: &str) -> Result<Self, serde_json::Error> {
        let mut message: Self = serde_json::from_str(text)?;
        message.server_id = server_id.to_string();
        Ok(message)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "timestamp must be a string or number, got {}",
            other
        ))),
    }
}
