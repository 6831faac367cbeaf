//! Notification records and the inputs that create or patch them.
//!
//! All records serialize in camelCase, matching what UI consumers receive.
//! Patches are shallow: every field that is set replaces the stored value,
//! except `progress`, which is merged field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel assigned to notifications that do not name one.
pub const DEFAULT_CHANNEL: &str = "global";

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Informational.
    #[default]
    Info,
    /// Success.
    Success,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Long-running operation with progress.
    Progress,
}

/// Progress of a long-running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Units completed.
    pub current: f64,
    /// Total units.
    pub total: f64,
    /// Status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Whether the total is unknown.
    #[serde(default)]
    pub indeterminate: bool,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            current: 0.0,
            total: 100.0,
            status: None,
            indeterminate: false,
        }
    }
}

impl Progress {
    /// Creates determinate progress.
    #[must_use]
    pub fn new(current: f64, total: f64) -> Self {
        Self {
            current,
            total,
            ..Default::default()
        }
    }

    /// Completion in whole percent, clamped to `0..=100`.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total <= 0.0 || !self.current.is_finite() {
            return 0;
        }
        let percent = (self.current / self.total * 100.0).round().clamp(0.0, 100.0);
        percent as u8
    }

    /// Returns true before any unit of an indeterminate operation is done.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.indeterminate && self.current == 0.0
    }
}

/// Partial progress; unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    /// Units completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    /// Total units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Whether the total is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indeterminate: Option<bool>,
}

impl ProgressPatch {
    /// Patch that only moves `current`.
    #[must_use]
    pub fn current(current: f64) -> Self {
        Self {
            current: Some(current),
            ..Default::default()
        }
    }

    /// Merges the patch into `base`, starting from default progress when
    /// there is none.
    #[must_use]
    pub fn apply_to(self, base: Option<Progress>) -> Progress {
        let mut progress = base.unwrap_or_default();
        if let Some(current) = self.current {
            progress.current = current;
        }
        if let Some(total) = self.total {
            progress.total = total;
        }
        if let Some(status) = self.status {
            progress.status = Some(status);
        }
        if let Some(indeterminate) = self.indeterminate {
            progress.indeterminate = indeterminate;
        }
        progress
    }
}

impl From<Progress> for ProgressPatch {
    fn from(progress: Progress) -> Self {
        Self {
            current: Some(progress.current),
            total: Some(progress.total),
            status: progress.status,
            indeterminate: Some(progress.indeterminate),
        }
    }
}

/// Button attached to a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAction {
    /// Button label.
    pub label: String,
    /// Action identifier handed back to the UI.
    pub action: String,
    /// Extra data for the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique id.
    pub id: String,
    /// Channel the notification belongs to.
    pub channel: String,
    /// Severity.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Main text.
    pub message: String,
    /// Heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Secondary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Buttons.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    /// Arbitrary attached data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Progress of the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Read flag.
    pub is_read: bool,
    /// Whether the notification is rendered as a toast.
    pub show_as_toast: bool,
    /// Set once a toast has been shown.
    pub already_shown_toast: bool,
}

impl Notification {
    /// Builds a new record, filling defaults for every unset option.
    #[must_use]
    pub fn from_options(id: String, options: NotificationOptions, now: DateTime<Utc>) -> Self {
        Self {
            id,
            channel: options.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            kind: options.kind.unwrap_or_default(),
            message: options.message.unwrap_or_default(),
            title: options.title,
            details: options.details,
            actions: options.actions.unwrap_or_default(),
            data: options.data,
            progress: options.progress.map(|patch| patch.apply_to(None)),
            timestamp: now,
            updated_at: now,
            is_read: options.is_read.unwrap_or(false),
            show_as_toast: options.show_as_toast.unwrap_or(true),
            already_shown_toast: false,
        }
    }

    /// Applies a patch and bumps `updated_at`.
    pub fn apply(&mut self, patch: NotificationPatch, now: DateTime<Utc>) {
        if let Some(channel) = patch.channel {
            self.channel = channel;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(details) = patch.details {
            self.details = Some(details);
        }
        if let Some(actions) = patch.actions {
            self.actions = actions;
        }
        if let Some(data) = patch.data {
            self.data = Some(data);
        }
        if let Some(progress) = patch.progress {
            self.progress = Some(progress.apply_to(self.progress.take()));
        }
        if let Some(is_read) = patch.is_read {
            self.is_read = is_read;
        }
        if let Some(show_as_toast) = patch.show_as_toast {
            self.show_as_toast = show_as_toast;
        }
        self.updated_at = now;
    }
}

/// Input to `create_notification`.
///
/// Also the shape of an inbound notification body. Unset fields take their
/// defaults only when a new record is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    /// Id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Channel, `"global"` by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Severity, `info` by default.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    /// Main text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Secondary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<NotificationAction>>,
    /// Arbitrary attached data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressPatch>,
    /// Read flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    /// Toast flag, `true` by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_as_toast: Option<bool>,
    /// Show the toast again even if one was already shown.
    #[serde(default)]
    pub replace: bool,
}

impl NotificationOptions {
    /// Creates options with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the progress.
    #[must_use]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress.into());
        self
    }

    /// Disables the toast.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.show_as_toast = Some(false);
        self
    }
}

/// Input to `update_notification`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPatch {
    /// Channel.
    pub channel: Option<String>,
    /// Severity.
    pub kind: Option<NotificationKind>,
    /// Main text.
    pub message: Option<String>,
    /// Heading.
    pub title: Option<String>,
    /// Secondary text.
    pub details: Option<String>,
    /// Buttons.
    pub actions: Option<Vec<NotificationAction>>,
    /// Arbitrary attached data.
    pub data: Option<Value>,
    /// Progress, merged field by field.
    pub progress: Option<ProgressPatch>,
    /// Read flag.
    pub is_read: Option<bool>,
    /// Toast flag.
    pub show_as_toast: Option<bool>,
    /// Show the toast again even if one was already shown.
    pub replace: bool,
}

impl NotificationPatch {
    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the progress patch.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressPatch) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Requests the toast be shown again.
    #[must_use]
    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

impl From<NotificationOptions> for NotificationPatch {
    fn from(options: NotificationOptions) -> Self {
        Self {
            channel: options.channel,
            kind: options.kind,
            message: options.message,
            title: options.title,
            details: options.details,
            actions: options.actions,
            data: options.data,
            progress: options.progress,
            is_read: options.is_read,
            show_as_toast: options.show_as_toast,
            replace: options.replace,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn running() -> Progress {
        Progress {
            current: 10.0,
            total: 100.0,
            status: Some("running".to_string()),
            indeterminate: false,
        }
    }

    #[test]
    fn test_from_options_defaults() {
        let now = Utc::now();
        let n = Notification::from_options("n1".to_string(), NotificationOptions::default(), now);

        assert_eq!(n.channel, "global");
        assert_eq!(n.kind, NotificationKind::Info);
        assert!(n.show_as_toast);
        assert!(!n.is_read);
        assert!(!n.already_shown_toast);
        assert_eq!(n.timestamp, now);
        assert_eq!(n.updated_at, now);
    }

    #[test]
    fn test_progress_deep_merge() {
        let now = Utc::now();
        let mut n = Notification::from_options(
            "x".to_string(),
            NotificationOptions::new("upload").with_progress(running()),
            now,
        );

        n.apply(
            NotificationPatch::default().with_progress(ProgressPatch::current(50.0)),
            now,
        );

        assert_eq!(
            n.progress,
            Some(Progress {
                current: 50.0,
                total: 100.0,
                status: Some("running".to_string()),
                indeterminate: false,
            })
        );
    }

    #[test]
    fn test_shallow_merge_keeps_unset_fields() {
        let created = Utc::now();
        let mut n = Notification::from_options(
            "x".to_string(),
            NotificationOptions::new("first")
                .with_title("Title")
                .with_kind(NotificationKind::Warning),
            created,
        );
        let later = created + chrono::Duration::seconds(5);

        n.apply(NotificationPatch::default().with_message("second"), later);

        assert_eq!(n.message, "second");
        assert_eq!(n.title.as_deref(), Some("Title"));
        assert_eq!(n.kind, NotificationKind::Warning);
        assert_eq!(n.timestamp, created);
        assert_eq!(n.updated_at, later);
    }

    #[test]
    fn test_percent() {
        assert_eq!(Progress::new(50.0, 200.0).percent(), 25);
        assert_eq!(Progress::new(300.0, 100.0).percent(), 100);
        assert_eq!(Progress::new(5.0, 0.0).percent(), 0);
    }

    #[test]
    fn test_is_loading() {
        let mut progress = Progress {
            indeterminate: true,
            ..Default::default()
        };
        assert!(progress.is_loading());

        progress.current = 1.0;
        assert!(!progress.is_loading());
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let n = Notification::from_options(
            "n1".to_string(),
            NotificationOptions::new("hi").with_kind(NotificationKind::Success),
            Utc::now(),
        );
        let value = serde_json::to_value(&n).expect("serialize");

        assert_eq!(value["type"], "success");
        assert_eq!(value["isRead"], false);
        assert_eq!(value["showAsToast"], true);
        assert_eq!(value["alreadyShownToast"], false);
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("progress").is_none());
    }

    #[test]
    fn test_options_deserialize_from_body() {
        let options: NotificationOptions = serde_json::from_value(json!({
            "id": "n1",
            "type": "progress",
            "message": "copying",
            "showAsToast": false,
            "progress": { "current": 0, "indeterminate": true }
        }))
        .expect("options");

        assert_eq!(options.kind, Some(NotificationKind::Progress));
        assert_eq!(options.show_as_toast, Some(false));
        let progress = options.progress.expect("progress").apply_to(None);
        assert!(progress.is_loading());
        assert_eq!(progress.total, 100.0);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<NotificationOptions, _> =
            serde_json::from_value(json!({ "type": "modal" }));
        assert!(result.is_err());
    }
}
