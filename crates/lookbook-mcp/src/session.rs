//! Negotiated MCP session.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::interpreter::{ResponseMode, data_segment, frame_lines};
use crate::protocol::{InitializeResult, ServerInfo};

/// A session token bound to one handshake.
///
/// The token is opaque and single-use per submission; there is no teardown,
/// the server expires it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    protocol_version: Option<String>,
    server_info: Option<ServerInfo>,
}

impl Session {
    /// Wrap a token with whatever the handshake body told us.
    pub fn new(id: impl Into<String>, handshake: InitializeResult) -> Self {
        Self {
            id: id.into(),
            protocol_version: handshake.protocol_version,
            server_info: handshake.server_info,
        }
    }

    /// The `mcp-session-id` value.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol version the server agreed to, if it said.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Server identity, if the handshake body carried one.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("protocol_version", &self.protocol_version)
            .field(
                "server",
                &self.server_info.as_ref().map(|s| s.name.as_str()),
            )
            .finish()
    }
}

/// How long the handshake body may take once the headers are in.
pub(crate) const HANDSHAKE_BODY_TIMEOUT: Duration = Duration::from_secs(2);

/// Best-effort read of the handshake's `result`.
///
/// The body is informational only, so every failure collapses to defaults,
/// and reading it is capped at [`HANDSHAKE_BODY_TIMEOUT`].
pub(crate) async fn read_handshake(response: reqwest::Response) -> InitializeResult {
    let read = async move {
        match ResponseMode::of(&response) {
            ResponseMode::Document => match response.json::<Value>().await {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "initialize body is not JSON");
                    None
                }
            },
            ResponseMode::EventStream => first_message(response.bytes_stream()).await,
        }
    };

    handshake_result(bounded(HANDSHAKE_BODY_TIMEOUT, read).await)
}

async fn bounded<F>(limit: Duration, read: F) -> Option<Value>
where
    F: Future<Output = Option<Value>>,
{
    match tokio::time::timeout(limit, read).await {
        Ok(message) => message,
        Err(_) => {
            tracing::debug!(limit_ms = limit.as_millis() as u64, "initialize body not received in time");
            None
        }
    }
}

fn handshake_result(message: Option<Value>) -> InitializeResult {
    message
        .and_then(|m| m.get("result").cloned())
        .and_then(|result| serde_json::from_value(result).ok())
        .unwrap_or_default()
}

/// First `data:` line of an event-stream body, parsed as JSON.
async fn first_message<S, B, E>(body: S) -> Option<Value>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut lines = pin!(frame_lines(body));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => {
                if let Some(data) = data_segment(&line) {
                    return serde_json::from_str(data).ok();
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "initialize stream unreadable");
                return None;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_accessors() {
        let handshake: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "serverInfo": {"name": "fashion_recommender", "version": "1.9.0"}
        }))
        .unwrap();
        let session = Session::new("abc123", handshake);

        assert_eq!(session.id(), "abc123");
        assert_eq!(session.protocol_version(), Some("2025-03-26"));
        assert_eq!(session.server_info().unwrap().name, "fashion_recommender");
    }

    #[test]
    fn test_session_without_handshake_body() {
        let session = Session::new("abc123", InitializeResult::default());
        assert_eq!(session.id(), "abc123");
        assert!(session.server_info().is_none());
        assert!(format!("{:?}", session).contains("abc123"));
    }

    fn lines(body: &str) -> impl Stream<Item = std::result::Result<String, std::io::Error>> {
        futures::stream::iter(vec![Ok(body.to_string())])
    }

    #[tokio::test]
    async fn test_first_message_from_single_data_line() {
        let body = format!(
            ": ping\nevent: message\ndata: {}\n",
            json!({"result": {"serverInfo": {"name": "fashion_recommender", "version": "2.0"}}})
        );
        let result = handshake_result(first_message(lines(&body)).await);
        assert_eq!(result.server_info.unwrap().version, "2.0");
    }

    #[tokio::test]
    async fn test_first_message_without_data_is_none() {
        assert!(first_message(lines(": ping\n\n")).await.is_none());
        assert!(first_message(lines("data: not json\n")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_gives_up_after_limit() {
        let silent = futures::stream::pending::<std::result::Result<Vec<u8>, std::io::Error>>();
        let started = tokio::time::Instant::now();

        let message = bounded(HANDSHAKE_BODY_TIMEOUT, first_message(silent)).await;

        assert!(message.is_none());
        assert!(started.elapsed() >= HANDSHAKE_BODY_TIMEOUT);
        assert!(HANDSHAKE_BODY_TIMEOUT < Duration::from_secs(30));
    }

    #[test]
    fn test_handshake_result_defaults() {
        assert!(handshake_result(None).server_info.is_none());
        assert!(handshake_result(Some(json!({"error": {"code": 1}}))).server_info.is_none());
    }
}
