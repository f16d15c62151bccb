//! Session state machine
//!
//! `SessionState` is the single source of truth the presentation layer
//! renders. It only changes through [`SessionState::apply`], one event at a
//! time, so every handler's update is visible as a whole or not at all.

use super::codec::DownloadHandle;
use super::dispatcher::StatusMessage;
use super::request::SelectedFile;
use crate::error::{Result, SessionError};
use crate::quality::QualityTier;
use uuid::Uuid;

pub const STATUS_CONNECTED: &str = "WebSocket connected";
pub const STATUS_DISCONNECTED: &str = "WebSocket disconnected";
pub const STATUS_SENT: &str = "File sent via WebSocket";
pub const STATUS_READY: &str = "Video received and ready to download";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Upload sub-state, orthogonal to the connection phase
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    /// File is being read and encoded
    Encoding { file_name: String },
    /// Request is on the wire; waiting for the server
    AwaitingResponse {
        file_name: String,
        quality: QualityTier,
    },
}

impl UploadPhase {
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, UploadPhase::Idle)
    }
}

/// Everything that can change a session
#[derive(Debug)]
pub enum SessionEvent {
    Connecting { endpoint: String },
    Opened,
    TransportError(String),
    Closed,
    FileSelected(SelectedFile),
    SelectionCleared,
    QualitySelected(QualityTier),
    EncodingStarted {
        file_name: String,
        quality: QualityTier,
    },
    RequestSent,
    UploadAborted { reason: String },
    StatusReceived(StatusMessage),
    PayloadReceived(DownloadHandle),
}

#[derive(Debug, Default)]
pub struct SessionState {
    phase: ConnectionPhase,
    upload: UploadPhase,
    upload_status: String,
    selected_file: Option<SelectedFile>,
    quality: QualityTier,
    download: Option<DownloadHandle>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn upload(&self) -> &UploadPhase {
        &self.upload
    }

    pub fn upload_status(&self) -> &str {
        &self.upload_status
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn download(&self) -> Option<&DownloadHandle> {
        self.download.as_ref()
    }

    /// Check whether an upload may start right now and return the file to
    /// encode. Checks run in the order the user would hit them: no file,
    /// then no connection, then a busy session.
    pub fn ready_for_upload(&self) -> Result<&SelectedFile> {
        let file = self
            .selected_file
            .as_ref()
            .ok_or(SessionError::NoFileSelected)?;

        if self.phase != ConnectionPhase::Connected {
            return Err(SessionError::NotConnected);
        }

        if self.upload.is_outstanding() {
            return Err(SessionError::UploadInProgress);
        }

        Ok(file)
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connecting { endpoint } => {
                if self.phase == ConnectionPhase::Disconnected {
                    self.phase = ConnectionPhase::Connecting;
                    self.upload_status = format!("Connecting to {}", endpoint);
                }
            }
            SessionEvent::Opened => {
                if self.phase == ConnectionPhase::Connecting {
                    self.phase = ConnectionPhase::Connected;
                    self.upload_status = STATUS_CONNECTED.to_string();
                }
            }
            SessionEvent::TransportError(description) => {
                // Phase is finalized by the close that follows
                self.upload_status = format!("WebSocket error: {}", description);
            }
            SessionEvent::Closed => {
                self.phase = ConnectionPhase::Disconnected;
                self.upload = UploadPhase::Idle;
                self.upload_status = STATUS_DISCONNECTED.to_string();
            }
            SessionEvent::FileSelected(file) => {
                self.selected_file = Some(file);
            }
            SessionEvent::SelectionCleared => {
                self.selected_file = None;
            }
            SessionEvent::QualitySelected(quality) => {
                self.quality = quality;
            }
            SessionEvent::EncodingStarted { file_name, quality } => {
                self.upload = UploadPhase::Encoding { file_name };
                self.quality = quality;
            }
            SessionEvent::RequestSent => {
                if let UploadPhase::Encoding { file_name } = std::mem::take(&mut self.upload) {
                    self.upload = UploadPhase::AwaitingResponse {
                        file_name,
                        quality: self.quality,
                    };
                }
                self.upload_status = STATUS_SENT.to_string();
            }
            SessionEvent::UploadAborted { reason } => {
                self.upload = UploadPhase::Idle;
                self.upload_status = reason;
            }
            SessionEvent::StatusReceived(status) => {
                // Success keeps the upload outstanding; anything else ends it
                if !status.is_success() {
                    self.upload = UploadPhase::Idle;
                }
                self.upload_status = status.message;
            }
            SessionEvent::PayloadReceived(handle) => {
                // Replacing the handle drops (releases) the previous one
                self.download = Some(handle);
                self.upload = UploadPhase::Idle;
                self.upload_status = STATUS_READY.to_string();
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            upload: self.upload.clone(),
            upload_status: self.upload_status.clone(),
            selected_file_name: self.selected_file.as_ref().map(|f| f.name().to_string()),
            quality: self.quality,
            download: self.download.as_ref().map(|h| DownloadInfo {
                id: h.id(),
                size: h.len(),
                file_name: h.suggested_file_name().to_string(),
            }),
        }
    }
}

/// Metadata of the current download, safe to hand to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub id: Uuid,
    pub size: usize,
    pub file_name: String,
}

/// Read-only view of the session rendered by the UI
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub phase: ConnectionPhase,
    pub upload: UploadPhase,
    pub upload_status: String,
    pub selected_file_name: Option<String>,
    pub quality: QualityTier,
    pub download: Option<DownloadInfo>,
}
