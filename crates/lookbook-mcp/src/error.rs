//! Error types for the recommendation driver.

use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for driver operations.
///
/// Every variant is fatal for the submission it occurred in. Per-fragment
/// parse problems in an event stream are logged and never become an
/// `McpError`.
#[derive(Debug, Error)]
pub enum McpError {
    /// The image could not be read or encoded.
    #[error("failed to encode image: {0}")]
    Encoding(String),

    /// The initialize handshake returned a non-success status.
    #[error("Initialize failed: {status}\n{body}")]
    NegotiationFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The handshake succeeded but carried no session token.
    #[error("session error: missing session token (no mcp-session-id header)")]
    MissingSessionToken,

    /// The tool call returned a non-success status.
    #[error("Tool call failed: {status}\n{body}")]
    InvocationFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response document could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The tool ran but reported failure.
    #[error("tool error: {0}")]
    ToolError(String),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL is invalid.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The event stream broke mid-read.
    #[error("stream error: {0}")]
    Stream(String),

    /// Submit was called with no image selected.
    #[error("no image selected")]
    NoImage,

    /// Submit was called in a state that does not allow it.
    #[error("cannot submit: {0}")]
    InvalidState(String),

    /// Client could not be constructed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl McpError {
    /// Create an encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a malformed-response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Whether the failure happened while establishing the session.
    pub fn is_negotiation_error(&self) -> bool {
        matches!(
            self,
            Self::NegotiationFailed { .. } | Self::MissingSessionToken
        )
    }

    /// Whether the failure was a non-success status on the tool call.
    pub fn is_invocation_error(&self) -> bool {
        matches!(self, Self::InvocationFailed { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NegotiationFailed { status, .. } | Self::InvocationFailed { status, .. } => {
                Some(*status)
            }
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
