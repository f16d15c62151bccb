//! Payload codec
//!
//! Outbound: a local video file becomes a base64 data URL that can be
//! embedded in a JSON request. Inbound: a binary frame becomes a
//! [`DownloadHandle`] owned by the session.

use crate::error::{Result, SessionError};
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use std::path::Path;
use uuid::Uuid;

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// File name offered when the user saves the transcoded result
pub const DOWNLOAD_FILE_NAME: &str = "converted_video.mp4";

/// Media type used in the data URL prefix, derived from the extension
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("m4v") => "video/x-m4v",
        _ => "application/octet-stream",
    }
}

/// Encode raw bytes as `data:<media_type>;base64,<data>`
pub fn encode_bytes(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "{}{}{}{}",
        DATA_URL_SCHEME,
        media_type,
        BASE64_MARKER,
        STANDARD.encode(bytes)
    )
}

/// Read the whole file and encode it. The read is the only await point;
/// nothing partial is ever returned.
pub async fn encode_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(encode_bytes(media_type_for(path), &bytes))
}

/// Contents of a data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Inverse of [`encode_bytes`]
pub fn decode_payload(encoded: &str) -> Result<DecodedPayload> {
    let rest = encoded
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or_else(|| SessionError::InvalidPayload("missing data: prefix".to_string()))?;

    let (media_type, data) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| SessionError::InvalidPayload("missing ;base64, marker".to_string()))?;

    let bytes = STANDARD
        .decode(data)
        .map_err(|e| SessionError::InvalidPayload(e.to_string()))?;

    Ok(DecodedPayload {
        media_type: media_type.to_string(),
        bytes,
    })
}

/// Locally addressable resource over a transcoded video.
///
/// Not `Clone`: the session holds the only current handle, and dropping it
/// releases the bytes.
#[derive(Debug)]
pub struct DownloadHandle {
    id: Uuid,
    bytes: Bytes,
}

impl DownloadHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn suggested_file_name(&self) -> &'static str {
        DOWNLOAD_FILE_NAME
    }

    /// Write the video to `path`, creating parent directories as needed
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await?;
        tracing::info!("Saved {} bytes to {}", self.bytes.len(), path.display());
        Ok(())
    }
}

impl Drop for DownloadHandle {
    fn drop(&mut self) {
        tracing::debug!("Released download handle {} ({} bytes)", self.id, self.bytes.len());
    }
}

/// Wrap an inbound binary frame. `Bytes` is reference counted, so the frame
/// buffer is moved into the handle, not copied.
pub fn decode_to_downloadable(bytes: Bytes) -> DownloadHandle {
    DownloadHandle {
        id: Uuid::new_v4(),
        bytes,
    }
}
