//! JSON-RPC 2.0 wire types for the MCP streamable-HTTP transport.
//!
//! Every request goes to one endpoint as an HTTP POST. The server is free to
//! answer with a plain JSON document or with a `text/event-stream`, so every
//! request must advertise both in `Accept`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version sent in the handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Response header carrying the session token, and the request header that
/// binds later calls to it.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Content type of a single JSON document.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type of an incremental event stream.
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// `Accept` value for every request. Dropping either type gets a 406 from
/// streamable-HTTP servers, so this is a fixed part of the wire contract.
pub const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Name of the remote recommendation tool.
pub const RECOMMENDATION_TOOL: &str = "fashion_recommendation_tool";

/// Method names.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_CALL: &str = "tools/call";
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON-RPC Base Types
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID for correlating responses.
    pub id: u64,
    /// Method name to call.
    pub method: String,
    /// Method parameters (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object, as found in a reply's `error` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    #[serde(default)]
    pub code: i64,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MCP Handshake Types
// ─────────────────────────────────────────────────────────────────────────────

/// Client capabilities sent during initialization. Serializes to `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {}

/// Client identity sent during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new("fashion-web", "1.0.0")
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version.
    pub protocol_version: String,
    /// Client capabilities.
    pub capabilities: ClientCapabilities,
    /// Client info.
    pub client_info: ClientInfo,
}

impl InitializeParams {
    /// Handshake parameters for the given client identity.
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info,
        }
    }
}

/// Server info returned during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// The parts of the initialize result the client reads. Everything is
/// optional because the handshake body is informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Call Types
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for the tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments to pass to the tool.
    pub arguments: RecommendationArguments,
}

/// Arguments of the recommendation tool: `{ "args": { "image_bytes": ... } }`.
///
/// The extra `args` level mirrors the tool's single pydantic-model parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationArguments {
    pub args: ImagePayload,
}

/// The encoded image as the tool expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Base64 text, no data-URL prefix.
    pub image_bytes: String,
}

impl CallToolParams {
    /// Build the recommendation call for an already-encoded image.
    pub fn recommendation(image_base64: impl Into<String>) -> Self {
        Self {
            name: RECOMMENDATION_TOOL.to_string(),
            arguments: RecommendationArguments {
                args: ImagePayload {
                    image_bytes: image_base64.into(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let req = JsonRpcRequest::new(1, "initialize", Some(json!({"test": true})));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["method"], "initialize");
    }

    #[test]
    fn test_notification_has_no_id() {
        let note = JsonRpcNotification::new(methods::INITIALIZED, None);
        let value = serde_json::to_value(&note).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("params").is_none());
    }

    #[test]
    fn test_initialize_params_shape() {
        let params = InitializeParams::new(ClientInfo::default());
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "fashion-web", "version": "1.0.0"}
            })
        );
    }

    #[test]
    fn test_call_tool_params_shape() {
        let params = CallToolParams::recommendation("aGVsbG8=");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "fashion_recommendation_tool",
                "arguments": {"args": {"image_bytes": "aGVsbG8="}}
            })
        );
    }

    #[test]
    fn test_accept_lists_both_types() {
        assert!(ACCEPT_BOTH.contains(CONTENT_TYPE_JSON));
        assert!(ACCEPT_BOTH.contains(CONTENT_TYPE_EVENT_STREAM));
    }

    #[test]
    fn test_initialize_result_is_lenient() {
        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "fashion_recommender"}
        }))
        .unwrap();
        assert_eq!(result.protocol_version.as_deref(), Some("2025-03-26"));
        assert_eq!(result.server_info.unwrap().name, "fashion_recommender");

        let empty: InitializeResult = serde_json::from_value(json!({})).unwrap();
        assert!(empty.server_info.is_none());
    }

    #[test]
    fn test_json_rpc_error_display_and_defaults() {
        let error: JsonRpcError =
            serde_json::from_value(json!({"code": -32602, "message": "Invalid params"})).unwrap();
        assert_eq!(error.to_string(), "-32602: Invalid params");
        assert!(error.data.is_none());

        let bare: JsonRpcError = serde_json::from_value(json!({"message": "no code"})).unwrap();
        assert_eq!(bare.code, 0);
    }
}
