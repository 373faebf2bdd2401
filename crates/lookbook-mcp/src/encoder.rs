//! Image payload encoding.

use std::fmt;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{McpError, Result};

/// A selected image together with its transport-safe encoding.
///
/// The encoding is computed once at construction and never changes; picking
/// a different image means building a new `UploadedImage`.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    name: String,
    bytes: Vec<u8>,
    encoded: String,
}

impl UploadedImage {
    /// Encode raw image bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(McpError::encoding(format!("'{}' is empty", name)));
        }
        let encoded = BASE64.encode(&bytes);
        Ok(Self {
            name,
            bytes,
            encoded,
        })
    }

    /// Read and encode an image file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| McpError::encoding(format!("cannot read '{}': {}", path.display(), e)))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read image");
        Self::from_bytes(name, bytes)
    }

    /// Accept a `data:<mime>;base64,<payload>` URL (or bare base64 text).
    ///
    /// The payload is decoded to validate it and re-encoded, so the stored
    /// encoding is canonical padded base64 with the prefix stripped.
    pub fn from_data_url(name: impl Into<String>, data_url: &str) -> Result<Self> {
        let payload = strip_data_url(data_url).trim();
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| McpError::encoding(format!("invalid base64 payload: {}", e)))?;
        Self::from_bytes(name, bytes)
    }

    /// Display name (file name for path-backed images).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 text without any data-URL prefix.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Size of the raw image in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty images are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// The encoded payload can be megabytes; keep it out of logs.
impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

/// Drop a `data:...,` prefix if present.
pub fn strip_data_url(value: &str) -> &str {
    match value.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, payload)| payload).unwrap_or(rest),
        None => value,
    }
}
