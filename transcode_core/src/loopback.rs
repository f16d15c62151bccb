//! Loopback transcode server
//!
//! Speaks the client protocol without transcoding anything: every upload is
//! acknowledged with a status frame and, optionally, echoed back as the
//! "converted" video. Used by the integration tests and `loopback_server`.

use crate::session::codec;
use crate::session::dispatcher::StatusMessage;
use crate::session::request::UploadRequest;
use anyhow::Result;
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Default port for the loopback server
pub const LOOPBACK_PORT: u16 = 8080;

/// Largest request the loopback server accepts. Base64 inflates a video by
/// a third, so this leaves room for multi-hundred-megabyte uploads.
pub const LOOPBACK_MAX_MESSAGE_SIZE: usize = 1 << 30;

#[derive(Debug, Clone)]
pub struct LoopbackOptions {
    /// Status frame sent for every well-formed request
    pub reply: StatusMessage,
    /// Send the decoded video back as a binary frame after the status
    pub echo_payload: bool,
}

impl Default for LoopbackOptions {
    fn default() -> Self {
        Self {
            reply: StatusMessage::success("queued"),
            echo_payload: true,
        }
    }
}

/// Shared loopback state; tests inspect it after a run
#[derive(Default)]
pub struct LoopbackState {
    pub options: LoopbackOptions,
    pub frames_received: AtomicUsize,
    pub requests: Mutex<Vec<UploadRequest>>,
}

impl LoopbackState {
    pub fn new(options: LoopbackOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            ..Default::default()
        })
    }

    pub fn frames_received(&self) -> usize {
        self.frames_received.load(Ordering::SeqCst)
    }
}

/// Build the router serving `/ws`
pub fn create_loopback_router(state: Arc<LoopbackState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade_handler))
        .with_state(state)
}

/// Serve the loopback router on `addr` until the process exits
pub async fn start_loopback_server(addr: SocketAddr, options: LoopbackOptions) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Loopback server listening on ws://{}/ws", listener.local_addr()?);
    axum::serve(listener, create_loopback_router(LoopbackState::new(options))).await?;
    Ok(())
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<LoopbackState>>,
) -> Response {
    ws.max_frame_size(LOOPBACK_MAX_MESSAGE_SIZE)
        .max_message_size(LOOPBACK_MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<LoopbackState>) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        };
        state.frames_received.fetch_add(1, Ordering::SeqCst);

        let (reply, video) = match parse_request(text.as_str()) {
            Ok((request, bytes)) => {
                tracing::info!(
                    "Loopback got {} ({} bytes) at quality {}",
                    request.file_name,
                    bytes.len(),
                    request.quality
                );
                state.requests.lock().await.push(request);
                (state.options.reply.clone(), Some(bytes))
            }
            Err(e) => {
                tracing::warn!("Loopback rejected request: {}", e);
                (StatusMessage::error(format!("Invalid request: {}", e)), None)
            }
        };

        let json = match serde_json::to_string(&reply) {
            Ok(json) => json,
            Err(_) => break,
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }

        if let Some(bytes) = video.filter(|_| state.options.echo_payload) {
            if sender.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    }
}

fn parse_request(text: &str) -> Result<(UploadRequest, Vec<u8>)> {
    let request: UploadRequest = serde_json::from_str(text)?;
    let decoded = codec::decode_payload(&request.encoded_payload)?;
    Ok((request, decoded.bytes))
}
