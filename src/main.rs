//! Beacon binary.
//!
//! Connects to one real-time server, joins the configured notification
//! channels and logs every notification event until interrupted.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use beacon_client::ws::config::DEFAULT_WS_URL;
use beacon_client::{WsConfig, WsService};
use beacon_notify::{NotificationEvent, NotificationService, NotifyConfig, TracingToasts};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,beacon_client=debug,beacon_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let url = env::var("BEACON_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
    let server_id = env::var("BEACON_SERVER_ID").unwrap_or_else(|_| "default".to_string());
    let channels: Vec<String> = env::var("BEACON_CHANNELS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|channel| !channel.is_empty())
        .map(str::to_string)
        .collect();

    let mut config = WsConfig::new(url.clone());
    if let Some(ms) = env_number::<u64>("BEACON_RECONNECT_INTERVAL_MS")? {
        config = config.with_reconnect_interval(Duration::from_millis(ms));
    }
    if let Some(attempts) = env_number::<u32>("BEACON_MAX_RECONNECT_ATTEMPTS")? {
        config = config.with_max_reconnect_attempts(attempts);
    }

    tracing::info!("Starting Beacon");
    tracing::info!("Server: {} at {}", server_id, url);
    tracing::info!(
        "Reconnect: every {:?}, at most {} attempts",
        config.reconnect_interval,
        config.max_reconnect_attempts
    );

    let ws = WsService::with_tungstenite(config).context("invalid client configuration")?;
    let _state_listener = ws.on_state_change(|server_id, state| {
        tracing::info!(server_id, %state, "connection state changed");
    });

    let notifications =
        NotificationService::new(ws.clone(), Arc::new(TracingToasts), NotifyConfig::default())
            .context("invalid notification configuration")?;

    for channel in &channels {
        notifications
            .subscribe_to_channel(channel, Some(server_id.as_str()))
            .with_context(|| format!("failed to join channel {}", channel))?;
    }

    let mut events = notifications.subscribe_events();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(NotificationEvent::Update(entries)) => {
                    tracing::info!(event = NotificationEvent::UPDATE, entries = entries.len());
                    for entry in entries {
                        tracing::debug!(
                            op = ?entry.op,
                            id = %entry.notification.id,
                            "{}",
                            entry.notification.message
                        );
                    }
                }
                Ok(NotificationEvent::Modal(modal)) => {
                    tracing::info!(
                        event = NotificationEvent::MODAL,
                        action = ?modal.action,
                        payload = %modal.payload
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification events lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    ws.connect(&server_id, &url);

    // Keep the process running
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down Beacon");

    notifications.cleanup();
    ws.disconnect_all();
    event_log.abort();

    let ws_metrics = ws.metrics().snapshot();
    let notify_metrics = notifications.metrics().snapshot();
    tracing::info!(?ws_metrics, ?notify_metrics, "final metrics");

    Ok(())
}

/// Reads an optional numeric environment variable.
fn env_number<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a valid number", name)),
        Err(_) => Ok(None),
    }
}
