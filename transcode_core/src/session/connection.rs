//! Connection manager
//!
//! Owns the one socket of a session. The socket itself runs in its own task
//! and reports back through [`SocketEvent`]s; the manager turns those into
//! session transitions. Only this module changes the connection phase.

use super::state::{ConnectionPhase, SessionEvent, SessionState};
use crate::error::{Result, SessionError};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

/// Identifies one socket over the life of a session
pub type ConnectionId = u64;

#[derive(Debug)]
pub enum SocketEventKind {
    Opened,
    Frame(Message),
    Error(String),
    Closed,
}

#[derive(Debug)]
pub struct SocketEvent {
    pub connection_id: ConnectionId,
    pub kind: SocketEventKind,
}

struct LiveSocket {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

pub struct ConnectionManager {
    events_tx: mpsc::Sender<SocketEvent>,
    live: Option<LiveSocket>,
    next_id: ConnectionId,
    connect_timeout: Duration,
    max_message_size: Option<usize>,
}

/// Check that `endpoint` is a `ws://` URL
pub fn validate_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint).map_err(|e| SessionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "ws" {
        return Err(SessionError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

impl ConnectionManager {
    /// `max_message_size` bounds one inbound frame or message; `None` lifts
    /// the limit.
    pub fn new(
        events_tx: mpsc::Sender<SocketEvent>,
        connect_timeout: Duration,
        max_message_size: Option<usize>,
    ) -> Self {
        Self {
            events_tx,
            live: None,
            next_id: 0,
            connect_timeout,
            max_message_size,
        }
    }

    /// Open a socket unless one is already open or opening.
    ///
    /// Returns `Ok(false)` when the call was a no-op.
    pub fn connect(&mut self, state: &mut SessionState, endpoint: &str) -> Result<bool> {
        if state.phase() != ConnectionPhase::Disconnected || self.live.is_some() {
            debug!("connect() ignored, socket already {:?}", state.phase());
            return Ok(false);
        }

        let url = validate_endpoint(endpoint)?;

        self.next_id += 1;
        let id = self.next_id;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        self.live = Some(LiveSocket {
            id,
            outbound: outbound_tx,
            cancel: cancel.clone(),
        });

        info!("Opening WebSocket #{} to {}", id, url);
        tokio::spawn(run_socket(
            url.to_string(),
            id,
            outbound_rx,
            self.events_tx.clone(),
            cancel,
            self.connect_timeout,
            socket_config(self.max_message_size),
        ));

        state.apply(SessionEvent::Connecting {
            endpoint: url.to_string(),
        });
        Ok(true)
    }

    /// Apply a socket event. Data frames are handed back for dispatch;
    /// events from a socket that is no longer current are dropped.
    pub fn handle_event(&mut self, state: &mut SessionState, event: SocketEvent) -> Option<Message> {
        let current = self.live.as_ref().map(|l| l.id);
        if current != Some(event.connection_id) {
            debug!(
                "Dropping event from stale socket #{} (current: {:?})",
                event.connection_id, current
            );
            return None;
        }

        match event.kind {
            SocketEventKind::Opened => {
                info!("WebSocket connected");
                state.apply(SessionEvent::Opened);
                None
            }
            SocketEventKind::Error(description) => {
                error!("WebSocket error: {}", description);
                state.apply(SessionEvent::TransportError(description));
                None
            }
            SocketEventKind::Closed => {
                info!("WebSocket disconnected");
                self.live = None;
                state.apply(SessionEvent::Closed);
                None
            }
            SocketEventKind::Frame(frame) => Some(frame),
        }
    }

    /// Queue a text frame on the open socket
    pub fn send(&self, state: &SessionState, text: String) -> Result<()> {
        if state.phase() != ConnectionPhase::Connected {
            return Err(SessionError::NotConnected);
        }

        let live = self.live.as_ref().ok_or(SessionError::NotConnected)?;
        live.outbound
            .send(Message::text(text))
            .map_err(|_| SessionError::NotConnected)
    }

    /// Ask the socket to close. The phase changes when its close event
    /// arrives.
    pub fn close(&self) {
        if let Some(live) = &self.live {
            info!("Closing WebSocket #{}", live.id);
            live.cancel.cancel();
        }
    }

}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// The transcoded video arrives as one binary frame, so the frame limit
/// matches the message limit.
fn socket_config(max_message_size: Option<usize>) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = max_message_size;
    config.max_frame_size = max_message_size;
    config
}

async fn emit(events_tx: &mpsc::Sender<SocketEvent>, connection_id: ConnectionId, kind: SocketEventKind) {
    let _ = events_tx.send(SocketEvent { connection_id, kind }).await;
}

async fn run_socket(
    endpoint: String,
    id: ConnectionId,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
    events_tx: mpsc::Sender<SocketEvent>,
    cancel: CancellationToken,
    connect_timeout: Duration,
    config: WebSocketConfig,
) {
    let handshake = tokio::time::timeout(
        connect_timeout,
        connect_async_with_config(endpoint.as_str(), Some(config), false),
    );

    let ws_stream = tokio::select! {
        _ = cancel.cancelled() => {
            emit(&events_tx, id, SocketEventKind::Closed).await;
            return;
        }
        res = handshake => {
            match res {
                Ok(Ok((ws_stream, _response))) => ws_stream,
                Ok(Err(e)) => {
                    emit(&events_tx, id, SocketEventKind::Error(e.to_string())).await;
                    emit(&events_tx, id, SocketEventKind::Closed).await;
                    return;
                }
                Err(_) => {
                    emit(
                        &events_tx,
                        id,
                        SocketEventKind::Error(format!("connection timed out after {:?}", connect_timeout)),
                    )
                    .await;
                    emit(&events_tx, id, SocketEventKind::Closed).await;
                    return;
                }
            }
        }
    };

    emit(&events_tx, id, SocketEventKind::Opened).await;
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            Some(msg) = outbound_rx.recv() => {
                if let Err(e) = write.send(msg).await {
                    emit(&events_tx, id, SocketEventKind::Error(e.to_string())).await;
                    break;
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(msg)) => emit(&events_tx, id, SocketEventKind::Frame(msg)).await,
                    Some(Err(e)) => {
                        emit(&events_tx, id, SocketEventKind::Error(e.to_string())).await;
                        break;
                    }
                }
            }
        }
    }

    // Flushes the close reply queued when the server closed first
    let _ = write.close().await;
    emit(&events_tx, id, SocketEventKind::Closed).await;
}
