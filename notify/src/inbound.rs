//! Decoding of inbound notification frames.
//!
//! A frame body is either a modal request or a notification. Anything that
//! is neither is rejected with a [`DecodeError`] and never reaches the
//! notification map.

use beacon_client::InboundMessage;
use serde_json::Value;

use crate::error::DecodeError;
use crate::types::NotificationOptions;

/// Prefix of per-channel notification event types.
pub const CHANNEL_EVENT_PREFIX: &str = "notification:";

/// Body of a modal request, forwarded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalPayload(pub Value);

/// A decoded notification with its resolved id.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    /// Body id, or the envelope id when the body has none.
    pub id: String,
    /// Fields carried by the body.
    pub options: NotificationOptions,
}

/// Closed set of inbound notification frames.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    /// Request to open a modal.
    Modal(ModalPayload),
    /// Notification to create or update.
    Notification(NotificationPayload),
}

/// Returns the event type used for a channel subscription.
#[must_use]
pub fn channel_event_type(channel: &str) -> String {
    format!("{}{}", CHANNEL_EVENT_PREFIX, channel)
}

/// Decodes the body of an inbound frame.
///
/// # Errors
///
/// Returns an error if the body is not an object, does not deserialize into
/// notification fields, or carries no id anywhere.
pub fn decode_inbound(message: &InboundMessage) -> Result<InboundKind, DecodeError> {
    let Value::Object(body) = &message.body else {
        return Err(DecodeError::NotAnObject);
    };

    let is_modal = body.get("type").and_then(Value::as_str) == Some("modal")
        || body.get("isModal").and_then(Value::as_bool) == Some(true);
    if is_modal {
        return Ok(InboundKind::Modal(ModalPayload(message.body.clone())));
    }

    let mut options: NotificationOptions = serde_json::from_value(message.body.clone())?;

    let id = options
        .id
        .take()
        .filter(|id| !id.is_empty())
        .or_else(|| (!message.id.is_empty()).then(|| message.id.clone()))
        .ok_or(DecodeError::MissingId)?;

    if options.message.is_none() && !message.message.is_empty() {
        options.message = Some(message.message.clone());
    }

    if options.channel.is_none() {
        options.channel = message
            .event_type
            .strip_prefix(CHANNEL_EVENT_PREFIX)
            .filter(|channel| !channel.is_empty())
            .map(str::to_string);
    }

    Ok(InboundKind::Notification(NotificationPayload { id, options }))
}
