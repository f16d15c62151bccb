//! Error taxonomy for the transcode session
//!
//! Every variant is handled at the boundary where it occurs; none of them
//! tears the session down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Upload triggered with nothing selected
    #[error("Please select a file to upload")]
    NoFileSelected,

    /// Selected file is not one of the accepted video types
    #[error("Please select a valid video file (.mp4 or .m4v), got: {file_name}")]
    InvalidFileType { file_name: String },

    /// Send attempted while the socket is not open
    #[error("WebSocket is not connected")]
    NotConnected,

    /// A previous upload is still being encoded or awaiting its response
    #[error("An upload is already in progress")]
    UploadInProgress,

    /// Inbound textual frame is not a `{status, message}` object
    #[error("Malformed server message: {0}")]
    MalformedServerMessage(#[from] serde_json::Error),

    /// Underlying socket failure
    #[error("WebSocket error: {0}")]
    Transport(String),

    /// Encoded payload is not a base64 data URL
    #[error("Invalid encoded payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
