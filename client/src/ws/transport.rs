//! Transport seam.
//!
//! The registry never talks to sockets directly. A [`Connector`] opens a
//! [`Transport`] for a URL and reports lifecycle events through a callback.
//! [`TungsteniteConnector`] drives real WebSocket connections on the tokio
//! runtime.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Close code used when a connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code used for a normal close.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code used when the peer sent a close frame without a status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Lifecycle event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Transport is open.
    Open,
    /// A text frame arrived.
    Message(String),
    /// Transport closed.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
    /// Transport failed.
    Error(String),
}

/// Callback receiving transport events.
pub type EventCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// A live, exclusively owned connection handle.
pub trait Transport: Send {
    /// Writes a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be handed to the socket.
    fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Starts closing the transport.
    fn close(&mut self);
}

/// Opens transports.
///
/// `open` must not invoke `on_event` before it returns; events are delivered
/// asynchronously once the transport makes progress.
pub trait Connector: Send + Sync {
    /// Opens a transport to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be constructed.
    fn open(&self, url: &str, on_event: EventCallback) -> Result<Box<dyn Transport>, ClientError>;
}

enum Command {
    Text(String),
    Close,
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn open(&self, url: &str, on_event: EventCallback) -> Result<Box<dyn Transport>, ClientError> {
        let request = url
            .into_client_request()
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let url = url.to_string();
        runtime.spawn(async move {
            run_socket(url, request, rx, on_event).await;
        });

        Ok(Box::new(TungsteniteTransport { commands: tx }))
    }
}

struct TungsteniteTransport {
    commands: mpsc::UnboundedSender<Command>,
}

impl Transport for TungsteniteTransport {
    fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.commands
            .send(Command::Text(text))
            .map_err(|_| ClientError::SendFailed("socket task has stopped".to_string()))
    }

    fn close(&mut self) {
        let _ = self.commands.send(Command::Close);
    }
}

async fn run_socket(
    url: String,
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    mut commands: mpsc::UnboundedReceiver<Command>,
    on_event: EventCallback,
) {
    let stream = match tokio_tungstenite::connect_async(request).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            on_event(TransportEvent::Error(e.to_string()));
            on_event(abnormal(e.to_string()));
            return;
        }
    };

    debug!(%url, "socket connected");
    on_event(TransportEvent::Open);

    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        warn!(%url, "socket write failed: {}", e);
                        on_event(abnormal(e.to_string()));
                        return;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    on_event(TransportEvent::Close {
                        code: NORMAL_CLOSURE,
                        reason: "closed by client".to_string(),
                    });
                    return;
                }
            },
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    on_event(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                    on_event(TransportEvent::Close { code, reason });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    on_event(TransportEvent::Error(e.to_string()));
                    on_event(abnormal(e.to_string()));
                    return;
                }
                None => {
                    on_event(abnormal("stream ended".to_string()));
                    return;
                }
            },
        }
    }
}

fn abnormal(reason: String) -> TransportEvent {
    TransportEvent::Close {
        code: ABNORMAL_CLOSURE,
        reason,
    }
}
