//! Notification service.
//!
//! Keeps the in-memory notification collection, publishes the full list on
//! every change, batches mutations into side-channel events and drives the
//! toast renderer. Inbound notifications arrive through one global
//! subscription plus one subscription per joined channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beacon_client::ws::{ChannelRegistration, REGISTRATION_EVENT_TYPE};
use beacon_client::{InboundMessage, Subscription, WsService};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::batch::{BatchEntry, BatchOp, BatchQueue};
use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::events::{ModalEvent, NotificationEvent};
use crate::inbound::{channel_event_type, decode_inbound, InboundKind, NotificationPayload};
use crate::metrics::NotifyMetrics;
use crate::toast::{Toast, ToastRenderer};
use crate::types::{Notification, NotificationOptions, NotificationPatch};

const ID_SUFFIX_LEN: usize = 9;

#[derive(Default)]
struct State {
    notifications: HashMap<String, Notification>,
    /// Ids in creation order.
    order: Vec<String>,
    batch: BatchQueue,
    global: Option<Subscription>,
    channels: HashMap<String, Subscription>,
}

impl State {
    fn snapshot(&self) -> Vec<Notification> {
        self.order
            .iter()
            .filter_map(|id| self.notifications.get(id).cloned())
            .collect()
    }

    fn remove(&mut self, id: &str) -> Option<Notification> {
        let notification = self.notifications.remove(id)?;
        self.order.retain(|other| other != id);
        Some(notification)
    }

    fn stage(&mut self, op: BatchOp, notification: Notification, show_toast: bool) -> Mutation {
        let schedule_flush = self.batch.push(BatchEntry::new(op, notification.clone()));
        Mutation {
            op,
            notification,
            show_toast,
            schedule_flush,
            snapshot: self.snapshot(),
        }
    }
}

/// Outcome of one mutation, applied after the state lock is released.
struct Mutation {
    op: BatchOp,
    notification: Notification,
    show_toast: bool,
    schedule_flush: bool,
    snapshot: Vec<Notification>,
}

struct Inner {
    config: NotifyConfig,
    ws: WsService,
    toasts: Arc<dyn ToastRenderer>,
    state: Mutex<State>,
    /// Held from the end of a mutation until its toasts and events are out.
    effects: Mutex<()>,
    list: watch::Sender<Vec<Notification>>,
    events: broadcast::Sender<NotificationEvent>,
    metrics: Arc<NotifyMetrics>,
}

/// User-facing notification collection fed by the real-time client.
///
/// Cheap to clone; all clones share the same collection.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("config", &self.inner.config)
            .field("notifications", &self.inner.list.borrow().len())
            .finish()
    }
}

impl NotificationService {
    /// Creates the service and subscribes to the global notification type.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        ws: WsService,
        toasts: Arc<dyn ToastRenderer>,
        config: NotifyConfig,
    ) -> Result<Self, NotifyError> {
        config.validate()?;

        let (list, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(config.event_capacity);

        let service = Self {
            inner: Arc::new(Inner {
                config,
                ws,
                toasts,
                state: Mutex::new(State::default()),
                effects: Mutex::new(()),
                list,
                events,
                metrics: Arc::new(NotifyMetrics::new()),
            }),
        };

        let global_type = service.inner.config.global_event_type.clone();
        let global = service.listen(&global_type, None);
        lock(&service.inner.state).global = Some(global);

        info!(event_type = %global_type, "notification service started");
        Ok(service)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &NotifyConfig {
        &self.inner.config
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<NotifyMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    /// Creates a notification, or updates it when its id is already known.
    ///
    /// An id of the form `notif_{millis}_{suffix}` is generated when none is
    /// given. Returns the stored record.
    pub fn create_notification(&self, mut options: NotificationOptions) -> Notification {
        let id = options
            .id
            .take()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_id(Utc::now()));
        self.upsert(id, options)
    }

    /// Patches a notification. Returns `None` for unknown ids.
    pub fn update_notification(&self, id: &str, patch: NotificationPatch) -> Option<Notification> {
        let now = Utc::now();
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        let existing = state.notifications.get_mut(id)?;
        let show_toast = apply_patch(existing, patch, now);
        let notification = existing.clone();
        let mutation = state.stage(BatchOp::Update, notification, show_toast);
        Some(self.commit(guard, mutation))
    }

    /// Removes a notification and its toast. Returns `None` for unknown ids.
    ///
    /// The record carries its own channel, so none is passed here.
    pub fn delete_notification(&self, id: &str) -> Option<Notification> {
        let mut state = lock(&self.inner.state);
        let notification = state.remove(id)?;
        let mutation = state.stage(BatchOp::Delete, notification, false);
        Some(self.commit(state, mutation))
    }

    /// Marks a notification read.
    ///
    /// Returns false, and emits nothing, for unknown or already read ids.
    pub fn mark_as_read(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        let notification = match state.notifications.get_mut(id) {
            Some(notification) if !notification.is_read => notification,
            _ => return false,
        };
        notification.is_read = true;
        notification.updated_at = now;
        let notification = notification.clone();
        let mutation = state.stage(BatchOp::Update, notification, false);
        self.commit(guard, mutation);
        true
    }

    /// Marks every notification read. Returns how many changed.
    pub fn mark_all_as_read(&self) -> usize {
        let now = Utc::now();
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        let mut changed = 0;
        let mut schedule_flush = false;

        for id in &state.order {
            let Some(notification) = state.notifications.get_mut(id) else {
                continue;
            };
            if notification.is_read {
                continue;
            }
            notification.is_read = true;
            notification.updated_at = now;
            changed += 1;
            schedule_flush |= state
                .batch
                .push(BatchEntry::new(BatchOp::Update, notification.clone()));
        }
        if changed > 0 {
            self.inner.list.send_replace(state.snapshot());
        }
        drop(guard);

        if changed > 0 {
            for _ in 0..changed {
                self.inner.metrics.record_updated();
            }
            debug!(changed, "marked all notifications read");
        }
        if schedule_flush {
            self.schedule_flush();
        }
        changed
    }

    /// Deletes every notification. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        let order = std::mem::take(&mut state.order);
        let mut removed = Vec::with_capacity(order.len());
        let mut schedule_flush = false;

        for id in order {
            if let Some(notification) = state.notifications.remove(&id) {
                schedule_flush |= state
                    .batch
                    .push(BatchEntry::new(BatchOp::Delete, notification));
                removed.push(id);
            }
        }
        if !removed.is_empty() {
            self.inner.list.send_replace(Vec::new());
        }
        let effects = lock(&self.inner.effects);
        drop(guard);

        if !removed.is_empty() {
            for id in &removed {
                self.inner.metrics.record_deleted();
                self.dismiss_toast(id);
            }
            info!(removed = removed.len(), "cleared notifications");
        }
        drop(effects);
        if schedule_flush {
            self.schedule_flush();
        }
        removed.len()
    }

    /// Returns a notification by id.
    #[must_use]
    pub fn get_notification(&self, id: &str) -> Option<Notification> {
        lock(&self.inner.state).notifications.get(id).cloned()
    }

    /// Returns the number of unread notifications.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        lock(&self.inner.state)
            .notifications
            .values()
            .filter(|notification| !notification.is_read)
            .count()
    }

    /// Returns a receiver of the full notification list.
    ///
    /// The receiver sees the current list immediately and every later one.
    #[must_use]
    pub fn notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.list.subscribe()
    }

    /// Returns the full notification list as a stream.
    #[must_use]
    pub fn notification_stream(&self) -> WatchStream<Vec<Notification>> {
        WatchStream::new(self.notifications())
    }

    /// Subscribes to batch and modal events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.events.subscribe()
    }

    /// Raises a modal close event.
    pub fn close_modal(&self, payload: Value) {
        self.emit(NotificationEvent::Modal(ModalEvent::close(payload)));
    }

    /// Joins a notification channel.
    ///
    /// With a server id, only that connection's messages are accepted and a
    /// registration is sent to it. Returns false if already joined.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration cannot be sent. The channel is
    /// left unjoined so the call can be retried.
    pub fn subscribe_to_channel(&self, channel: &str, server_id: Option<&str>) -> Result<bool, NotifyError> {
        let key = channel_key(channel, server_id);
        {
            let mut state = lock(&self.inner.state);
            if state.channels.contains_key(&key) {
                debug!(channel, server_id = ?server_id, "channel already joined");
                return Ok(false);
            }
            let subscription = self.listen(&channel_event_type(channel), server_id);
            state.channels.insert(key.clone(), subscription);
        }

        if let Some(server_id) = server_id {
            if let Err(e) = self.register_channel(channel, server_id) {
                warn!(channel, server_id, "channel registration failed: {}", e);
                if let Some(subscription) = lock(&self.inner.state).channels.remove(&key) {
                    subscription.unsubscribe();
                }
                return Err(e);
            }
        }

        info!(channel, server_id = ?server_id, "joined channel");
        Ok(true)
    }

    fn register_channel(&self, channel: &str, server_id: &str) -> Result<(), NotifyError> {
        let registration =
            ChannelRegistration::single(self.inner.config.client_id.as_str(), channel);
        self.inner.ws.send(
            server_id,
            REGISTRATION_EVENT_TYPE,
            serde_json::to_value(registration)?,
        )?;
        Ok(())
    }

    /// Leaves a notification channel. Returns false if not joined.
    pub fn unsubscribe_from_channel(&self, channel: &str, server_id: Option<&str>) -> bool {
        let key = channel_key(channel, server_id);
        let Some(subscription) = lock(&self.inner.state).channels.remove(&key) else {
            return false;
        };
        subscription.unsubscribe();
        info!(channel, server_id = ?server_id, "left channel");
        true
    }

    /// Returns the joined channel keys, sorted.
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.inner.state).channels.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drops the global and every channel subscription.
    pub fn cleanup(&self) {
        let (global, channels) = {
            let mut state = lock(&self.inner.state);
            (state.global.take(), std::mem::take(&mut state.channels))
        };

        let channel_count = channels.len();
        if let Some(global) = global {
            global.unsubscribe();
        }
        for (_, subscription) in channels {
            subscription.unsubscribe();
        }
        info!(channels = channel_count, "notification service cleaned up");
    }

    /// Emits pending mutations now. Returns the number of entries flushed.
    pub fn flush(&self) -> usize {
        let mut state = lock(&self.inner.state);
        let entries = state.batch.take();
        if entries.is_empty() {
            return 0;
        }
        let _effects = lock(&self.inner.effects);
        drop(state);

        let count = entries.len();
        self.inner.metrics.record_batch_flushed();
        debug!(entries = count, "flushing notification batch");
        self.emit(NotificationEvent::Update(entries));
        count
    }

    fn listen(&self, event_type: &str, server_id: Option<&str>) -> Subscription {
        let inner = Arc::downgrade(&self.inner);
        self.inner.ws.subscribe(
            event_type,
            move |message| {
                if let Some(inner) = inner.upgrade() {
                    NotificationService { inner }.handle_inbound(message);
                }
            },
            server_id,
        )
    }

    fn handle_inbound(&self, message: &InboundMessage) {
        match decode_inbound(message) {
            Ok(InboundKind::Modal(payload)) => {
                self.inner.metrics.record_modal_event();
                debug!(server_id = %message.server_id, "modal requested");
                self.emit(NotificationEvent::Modal(ModalEvent::open(payload.0)));
            }
            Ok(InboundKind::Notification(NotificationPayload { id, options })) => {
                self.upsert(id, options);
            }
            Err(e) => {
                self.inner.metrics.record_inbound_rejected();
                warn!(
                    server_id = %message.server_id,
                    event_type = %message.event_type,
                    "dropping notification frame: {}",
                    e
                );
            }
        }
    }

    fn upsert(&self, id: String, options: NotificationOptions) -> Notification {
        let now = Utc::now();
        let mut guard = lock(&self.inner.state);
        let state = &mut *guard;
        let (op, notification, show_toast) = match state.notifications.get_mut(&id) {
            Some(existing) => {
                let show_toast = apply_patch(existing, options.into(), now);
                (BatchOp::Update, existing.clone(), show_toast)
            }
            None => {
                let mut notification = Notification::from_options(id.clone(), options, now);
                let show_toast = notification.show_as_toast;
                notification.already_shown_toast = show_toast;
                state.order.push(id.clone());
                state.notifications.insert(id, notification.clone());
                (BatchOp::Add, notification, show_toast)
            }
        };
        let mutation = state.stage(op, notification, show_toast);
        self.commit(guard, mutation)
    }

    /// Publishes a staged mutation and runs its side effects.
    ///
    /// The list is replaced and the effects lock taken before the state lock
    /// is released, so list updates and toast calls follow mutation order.
    fn commit(&self, state: MutexGuard<'_, State>, mutation: Mutation) -> Notification {
        let Mutation {
            op,
            notification,
            show_toast,
            schedule_flush,
            snapshot,
        } = mutation;

        self.inner.list.send_replace(snapshot);
        let effects = lock(&self.inner.effects);
        drop(state);

        match op {
            BatchOp::Add => self.inner.metrics.record_created(),
            BatchOp::Update => self.inner.metrics.record_updated(),
            BatchOp::Delete => self.inner.metrics.record_deleted(),
        }
        debug!(id = %notification.id, op = ?op, "notification changed");

        if show_toast {
            self.show_toast(&notification);
        }
        if op == BatchOp::Delete {
            self.dismiss_toast(&notification.id);
        }
        drop(effects);
        if schedule_flush {
            self.schedule_flush();
        }
        notification
    }

    fn schedule_flush(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, flushing inline");
            self.flush();
            return;
        };

        let window = self.inner.config.batch_window;
        let inner = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            if window.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(window).await;
            }
            if let Some(inner) = inner.upgrade() {
                NotificationService { inner }.flush();
            }
        });
    }

    fn emit(&self, event: NotificationEvent) {
        let name = event.name();
        if self.inner.events.send(event).is_err() {
            debug!(event = name, "no event subscribers");
        }
    }

    fn show_toast(&self, notification: &Notification) {
        let toast = Toast::for_notification(notification);
        match self.inner.toasts.show(&toast) {
            Ok(()) => self.inner.metrics.record_toast_shown(),
            Err(e) => {
                self.inner.metrics.record_toast_failed();
                warn!(id = %toast.id, "failed to show toast: {}", e);
            }
        }
    }

    fn dismiss_toast(&self, id: &str) {
        if let Err(e) = self.inner.toasts.dismiss(id) {
            warn!(id, "failed to dismiss toast: {}", e);
        }
    }
}

/// Applies a patch and decides whether the toast must be shown again.
fn apply_patch(notification: &mut Notification, patch: NotificationPatch, now: DateTime<Utc>) -> bool {
    let replace = patch.replace;
    notification.apply(patch, now);

    let show_toast =
        notification.show_as_toast && (!notification.already_shown_toast || replace);
    if show_toast {
        notification.already_shown_toast = true;
    }
    show_toast
}

fn channel_key(channel: &str, server_id: Option<&str>) -> String {
    match server_id {
        Some(server_id) => format!("{}:{}", channel, server_id),
        None => channel.to_string(),
    }
}

fn generate_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect();
    format!("notif_{}_{}", now.timestamp_millis(), suffix)
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
