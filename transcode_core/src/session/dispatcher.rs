//! Inbound frame routing
//!
//! Text frames carry `{"status": "...", "message": "..."}`. Binary frames
//! carry the transcoded video with no metadata. There is no request id, so a
//! frame always belongs to the single outstanding upload.

use super::codec;
use super::state::{SessionEvent, SessionState};
use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub const SUCCESS: &'static str = "success";

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Self::SUCCESS.to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}

/// A classified server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Status(StatusMessage),
    Payload(Bytes),
}

/// What happened to a frame handed to [`dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Status,
    Payload,
    /// Malformed text frame, logged and dropped
    Discarded,
    /// Control frame, nothing to do
    Ignored,
}

/// Decode a frame. `Ok(None)` for control frames.
pub fn classify(frame: Message) -> Result<Option<ServerMessage>> {
    match frame {
        Message::Text(text) => {
            let status: StatusMessage = serde_json::from_str(text.as_str())?;
            Ok(Some(ServerMessage::Status(status)))
        }
        Message::Binary(bytes) => Ok(Some(ServerMessage::Payload(bytes))),
        _ => Ok(None),
    }
}

/// Route one frame into the session. Never fails: a frame that does not
/// decode leaves the state untouched.
pub fn dispatch(state: &mut SessionState, frame: Message) -> DispatchOutcome {
    match classify(frame) {
        Ok(Some(ServerMessage::Status(status))) => {
            info!("Received message: [{}] {}", status.status, status.message);
            state.apply(SessionEvent::StatusReceived(status));
            DispatchOutcome::Status
        }
        Ok(Some(ServerMessage::Payload(bytes))) => {
            info!("Received video data ({} bytes)", bytes.len());
            let handle = codec::decode_to_downloadable(bytes);
            state.apply(SessionEvent::PayloadReceived(handle));
            DispatchOutcome::Payload
        }
        Ok(None) => {
            debug!("Ignoring control frame");
            DispatchOutcome::Ignored
        }
        Err(e) => {
            warn!("Error parsing message: {}", e);
            DispatchOutcome::Discarded
        }
    }
}
