//! Beacon notify - user-facing notifications over the real-time client.
//!
//! [`NotificationService`] listens for notification frames on a
//! [`beacon_client::WsService`], keeps the notification collection,
//! publishes the full list through a `watch` channel, batches mutations into
//! [`NotificationEvent`]s and hands toasts to a [`ToastRenderer`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use beacon_client::{WsConfig, WsService};
//! use beacon_notify::{NotificationOptions, NotificationService, NotifyConfig, TracingToasts};
//!
//! let ws = WsService::with_tungstenite(WsConfig::default())?;
//! let notifications = NotificationService::new(ws, Arc::new(TracingToasts), NotifyConfig::default())?;
//!
//! notifications.subscribe_to_channel("builds", Some("server-1"))?;
//! notifications.create_notification(NotificationOptions::new("Saved"));
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod inbound;
pub mod metrics;
pub mod service;
pub mod toast;
pub mod types;

pub use batch::{BatchEntry, BatchOp, BatchQueue};
pub use config::{ConfigError, NotifyConfig};
pub use error::{DecodeError, NotifyError};
pub use events::{ModalAction, ModalEvent, NotificationEvent};
pub use inbound::{decode_inbound, InboundKind, ModalPayload, NotificationPayload};
pub use metrics::{NotifyMetrics, NotifyMetricsSnapshot};
pub use service::NotificationService;
pub use toast::{RecordingToasts, Toast, ToastCall, ToastKind, ToastRenderer, TracingToasts};
pub use types::{
    Notification, NotificationAction, NotificationKind, NotificationOptions, NotificationPatch,
    Progress, ProgressPatch,
};
