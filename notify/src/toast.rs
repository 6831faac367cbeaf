//! Toast presentation seam.
//!
//! The service decides when a toast is due; rendering belongs to a
//! [`ToastRenderer`] supplied by the application.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::NotifyError;
use crate::service::lock;
use crate::types::{Notification, NotificationKind};

/// How a toast is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// Informational.
    Info,
    /// Success.
    Success,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Spinner for an operation that has not started reporting.
    Loading,
    /// Progress bar.
    Progress {
        /// Completion in percent.
        percent: u8,
    },
}

/// A toast request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Id of the notification behind the toast.
    pub id: String,
    /// Rendering.
    pub kind: ToastKind,
    /// Heading.
    pub title: Option<String>,
    /// Main text.
    pub message: String,
}

impl Toast {
    /// Maps a notification onto its toast.
    #[must_use]
    pub fn for_notification(notification: &Notification) -> Self {
        let kind = match notification.kind {
            NotificationKind::Info => ToastKind::Info,
            NotificationKind::Success => ToastKind::Success,
            NotificationKind::Warning => ToastKind::Warning,
            NotificationKind::Error => ToastKind::Error,
            NotificationKind::Progress => match &notification.progress {
                Some(progress) if progress.is_loading() => ToastKind::Loading,
                Some(progress) => ToastKind::Progress {
                    percent: progress.percent(),
                },
                None => ToastKind::Progress { percent: 0 },
            },
        };

        Self {
            id: notification.id.clone(),
            kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
        }
    }
}

/// Renders toasts.
///
/// Calls are made one at a time in mutation order. A renderer must not call
/// back into the notification service from `show` or `dismiss`.
pub trait ToastRenderer: Send + Sync {
    /// Shows or replaces the toast with `toast.id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the toast could not be shown.
    fn show(&self, toast: &Toast) -> Result<(), NotifyError>;

    /// Removes the toast with `id`, if shown.
    ///
    /// # Errors
    ///
    /// Returns an error if the toast could not be removed.
    fn dismiss(&self, id: &str) -> Result<(), NotifyError>;
}

/// Renderer that writes toasts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingToasts;

impl ToastRenderer for TracingToasts {
    fn show(&self, toast: &Toast) -> Result<(), NotifyError> {
        info!(
            id = %toast.id,
            kind = ?toast.kind,
            title = toast.title.as_deref().unwrap_or(""),
            "{}",
            toast.message
        );
        Ok(())
    }

    fn dismiss(&self, id: &str) -> Result<(), NotifyError> {
        info!(id, "toast dismissed");
        Ok(())
    }
}

/// A call made on a [`RecordingToasts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastCall {
    /// `show` was called.
    Show(Toast),
    /// `dismiss` was called.
    Dismiss(String),
}

/// Renderer that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingToasts {
    calls: Arc<Mutex<Vec<ToastCall>>>,
}

impl RecordingToasts {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ToastCall> {
        lock(&self.calls).clone()
    }

    /// Returns the toasts shown, in order.
    #[must_use]
    pub fn shown(&self) -> Vec<Toast> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ToastCall::Show(toast) => Some(toast.clone()),
                ToastCall::Dismiss(_) => None,
            })
            .collect()
    }

    /// Returns the dismissed ids, in order.
    #[must_use]
    pub fn dismissed(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ToastCall::Dismiss(id) => Some(id.clone()),
                ToastCall::Show(_) => None,
            })
            .collect()
    }
}

impl ToastRenderer for RecordingToasts {
    fn show(&self, toast: &Toast) -> Result<(), NotifyError> {
        lock(&self.calls).push(ToastCall::Show(toast.clone()));
        Ok(())
    }

    fn dismiss(&self, id: &str) -> Result<(), NotifyError> {
        lock(&self.calls).push(ToastCall::Dismiss(id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{NotificationOptions, Progress};

    fn notification(options: NotificationOptions) -> Notification {
        Notification::from_options("n1".to_string(), options, Utc::now())
    }

    #[test]
    fn test_kinds_map_one_to_one() {
        for (kind, expected) in [
            (NotificationKind::Info, ToastKind::Info),
            (NotificationKind::Success, ToastKind::Success),
            (NotificationKind::Warning, ToastKind::Warning),
            (NotificationKind::Error, ToastKind::Error),
        ] {
            let toast = Toast::for_notification(&notification(
                NotificationOptions::new("m").with_kind(kind),
            ));
            assert_eq!(toast.kind, expected);
        }
    }

    #[test]
    fn test_progress_toast() {
        let loading = notification(
            NotificationOptions::new("m")
                .with_kind(NotificationKind::Progress)
                .with_progress(Progress {
                    indeterminate: true,
                    ..Default::default()
                }),
        );
        assert_eq!(Toast::for_notification(&loading).kind, ToastKind::Loading);

        let halfway = notification(
            NotificationOptions::new("m")
                .with_kind(NotificationKind::Progress)
                .with_progress(Progress::new(50.0, 100.0)),
        );
        assert_eq!(
            Toast::for_notification(&halfway).kind,
            ToastKind::Progress { percent: 50 }
        );
    }

    #[test]
    fn test_recording_toasts() {
        let toasts = RecordingToasts::new();
        let toast = Toast::for_notification(&notification(NotificationOptions::new("m")));

        toasts.show(&toast).expect("show");
        toasts.dismiss("n1").expect("dismiss");

        assert_eq!(toasts.shown(), vec![toast]);
        assert_eq!(toasts.dismissed(), vec!["n1".to_string()]);
        assert_eq!(toasts.calls().len(), 2);
    }
}
