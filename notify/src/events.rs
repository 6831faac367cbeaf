//! Side-channel events published to UI consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::BatchEntry;

/// Whether a modal should open or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalAction {
    /// Open the modal.
    Open,
    /// Close the modal.
    Close,
}

/// Modal intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalEvent {
    /// Open or close.
    pub action: ModalAction,
    /// Modal body as received.
    pub payload: Value,
}

impl ModalEvent {
    /// Creates an open intent.
    #[must_use]
    pub fn open(payload: Value) -> Self {
        Self {
            action: ModalAction::Open,
            payload,
        }
    }

    /// Creates a close intent.
    #[must_use]
    pub fn close(payload: Value) -> Self {
        Self {
            action: ModalAction::Close,
            payload,
        }
    }
}

/// Event published on the notification event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// One flushed batch of mutations, in the order they happened.
    Update(Vec<BatchEntry>),
    /// Modal intent.
    Modal(ModalEvent),
}

impl NotificationEvent {
    /// Name of batch events.
    pub const UPDATE: &'static str = "notification-update";

    /// Name of modal events.
    pub const MODAL: &'static str = "notification-modal";

    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update(_) => Self::UPDATE,
            Self::Modal(_) => Self::MODAL,
        }
    }

    /// Returns the event detail as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the detail cannot be serialized.
    pub fn detail(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Update(entries) => serde_json::to_value(entries),
            Self::Modal(modal) => serde_json::to_value(modal),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(NotificationEvent::Update(Vec::new()).name(), "notification-update");
        assert_eq!(
            NotificationEvent::Modal(ModalEvent::open(Value::Null)).name(),
            "notification-modal"
        );
    }

    #[test]
    fn test_modal_detail() {
        let event = NotificationEvent::Modal(ModalEvent::close(json!({ "id": "m" })));
        let detail = event.detail().expect("detail");
        assert_eq!(detail, json!({ "action": "close", "payload": { "id": "m" } }));
    }
}
