//! Upload request assembly
//!
//! Wire format (one text frame):
//! `{"file_name": "...", "video_quality_number": 0|1|2, "video_data": "data:...;base64,..."}`

use super::codec;
use super::connection::ConnectionManager;
use super::state::SessionState;
use crate::error::{Result, SessionError};
use crate::quality::QualityTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions the transcoder accepts
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["mp4", "m4v"];

/// A local video the user picked. Only constructible for accepted types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    path: PathBuf,
    name: String,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let accepted = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str()));

        if !accepted {
            return Err(SessionError::InvalidFileType { file_name: name });
        }

        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    #[serde(rename = "video_quality_number")]
    pub quality: QualityTier,
    #[serde(rename = "video_data")]
    pub encoded_payload: String,
}

/// Encode the selected file and assemble the request. The request only
/// exists once encoding has finished.
pub async fn build(file: Option<&SelectedFile>, quality: QualityTier) -> Result<UploadRequest> {
    let file = file.ok_or(SessionError::NoFileSelected)?;
    let encoded_payload = codec::encode_file(file.path()).await?;

    Ok(UploadRequest {
        file_name: file.name().to_string(),
        quality,
        encoded_payload,
    })
}

/// Serialize and hand the request to the connection
pub fn submit(
    connection: &ConnectionManager,
    state: &SessionState,
    request: &UploadRequest,
) -> Result<()> {
    if request.encoded_payload.is_empty() {
        return Err(SessionError::InvalidPayload(
            "refusing to send an empty payload".to_string(),
        ));
    }

    let frame = serde_json::to_string(request)?;
    connection.send(state, frame)?;

    tracing::info!(
        "Sent {} at quality {} ({} encoded bytes)",
        request.file_name,
        request.quality,
        request.encoded_payload.len()
    );
    Ok(())
}
