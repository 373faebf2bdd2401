//! Tool-call response interpretation.
//!
//! A `tools/call` reply comes in one of two shapes, chosen by the server and
//! announced only through `Content-Type`:
//!
//! ```text
//! application/json     {"result":{"content":[{"type":"text","text":"{\"recommendations\":[...]}"}]}}
//! text/event-stream    data: {"result":{"content":[{"type":"text","text":"..."}]}}\n
//!                      data: {...}\n
//! ```
//!
//! In a stream every `data:` line is one fragment. Blank separator lines
//! are optional and a final line without a newline still counts.
//!
//! The recommendation list usually sits inside a JSON document serialized
//! into the first content entry's `text` field. Older servers put it
//! directly at `result.recommendations`.

use std::fmt;
use std::pin::{Pin, pin};

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::protocol::{CONTENT_TYPE_EVENT_STREAM, JsonRpcError};
use crate::recommendation::{RecommendationItem, items_from_values};

/// Terminator some servers send as a final data segment.
const DONE_MARKER: &str = "[DONE]";

/// How a response body must be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One complete JSON document.
    Document,
    /// Event stream, one JSON document per `data:` line.
    EventStream,
}

impl ResponseMode {
    /// Classify from a `Content-Type` header value. Anything that is not an
    /// event stream, including a missing header, is a single document.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains(CONTENT_TYPE_EVENT_STREAM) => {
                Self::EventStream
            }
            _ => Self::Document,
        }
    }

    /// Classify a response by its headers.
    pub fn of(response: &reqwest::Response) -> Self {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        Self::from_content_type(content_type)
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::EventStream => write!(f, "event-stream"),
        }
    }
}

/// Read a tool-call response to completion.
///
/// `on_update` sees every list that replaces the current one: once for a
/// document, once per list-bearing fragment for a stream.
pub async fn interpret<F>(response: reqwest::Response, on_update: F) -> Result<Vec<RecommendationItem>>
where
    F: FnMut(&[RecommendationItem]),
{
    let mode = ResponseMode::of(&response);
    tracing::debug!(mode = %mode, "interpreting tool response");

    match mode {
        ResponseMode::Document => {
            let body = response.text().await?;
            interpret_document_with(&body, on_update)
        }
        ResponseMode::EventStream => interpret_stream(response.bytes_stream(), on_update).await,
    }
}

/// Parse a single-document body.
///
/// A body that is not JSON, or whose nested text document is not JSON, is a
/// [`McpError::MalformedResponse`]. A body with no recommendations anywhere
/// is an empty list.
pub fn interpret_document(body: &str) -> Result<Vec<RecommendationItem>> {
    interpret_document_with(body, |_| {})
}

fn interpret_document_with<F>(body: &str, mut on_update: F) -> Result<Vec<RecommendationItem>>
where
    F: FnMut(&[RecommendationItem]),
{
    tracing::trace!(body = %body, "tool response body");
    let document: Value = serde_json::from_str(body)
        .map_err(|e| McpError::malformed(format!("response is not JSON: {}", e)))?;
    let items = extract_document(&document)?;
    on_update(&items);
    Ok(items)
}

/// Apply the single-document extraction policy to a parsed reply.
///
/// In order, first match wins:
/// 1. `result.content[0].text` parsed as JSON, then its `recommendations`
/// 2. `result.recommendations`
/// 3. empty
///
/// A JSON-RPC `error` member is logged; it carries no list, so it ends in
/// rule 3 unless a `result` is present as well.
pub fn extract_document(document: &Value) -> Result<Vec<RecommendationItem>> {
    if let Some(error) = rpc_error(document) {
        tracing::warn!(code = error.code, error = %error, "tool response carries a JSON-RPC error");
    }

    let result = document.get("result");
    if let Some(result) = result
        && result.get("isError").and_then(Value::as_bool) == Some(true)
    {
        let message = nested_text(document).unwrap_or("tool reported an error");
        return Err(McpError::ToolError(message.to_string()));
    }

    if let Some(text) = nested_text(document) {
        let inner: Value = serde_json::from_str(text)
            .map_err(|e| McpError::malformed(format!("tool text is not JSON: {}", e)))?;
        return Ok(recommendations_of(&inner).unwrap_or_default());
    }

    if let Some(result) = result
        && let Some(items) = recommendations_of(result)
    {
        return Ok(items);
    }

    tracing::debug!("response carries no recommendations");
    Ok(Vec::new())
}

/// Read an event stream, keeping only the most recent list.
///
/// Each `data:` line is a fragment. Each fragment that yields a list
/// replaces the previous one. Fragments that fail to parse are logged and
/// skipped. Only a transport failure of the underlying byte stream aborts.
pub async fn interpret_stream<S, B, E, F>(body: S, mut on_update: F) -> Result<Vec<RecommendationItem>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
    F: FnMut(&[RecommendationItem]),
{
    let mut lines = pin!(frame_lines(body));
    let mut current = Vec::new();
    let mut fragment = 0usize;

    while let Some(line) = lines.next().await {
        let line = line.map_err(|e| McpError::Stream(e.to_string()))?;
        let Some(data) = data_segment(&line) else {
            continue;
        };

        fragment += 1;
        if let Some(items) = extract_fragment(fragment, data) {
            tracing::debug!(fragment, count = items.len(), "stream fragment replaced results");
            current = items;
            on_update(&current);
        }
    }

    tracing::debug!(fragments = fragment, count = current.len(), "event stream finished");
    Ok(current)
}

struct LineReader<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    done: bool,
}

/// Split a byte stream into lines, without their `\n` or `\r\n`.
///
/// Lines may span chunk boundaries. A trailing line with no newline is
/// yielded once the body ends. A transport error is yielded once and ends
/// the stream.
pub(crate) fn frame_lines<S, B, E>(body: S) -> impl Stream<Item = std::result::Result<String, E>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
{
    let reader = LineReader {
        body: Box::pin(body),
        buffer: Vec::new(),
        done: false,
    };

    futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(end) = reader.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = reader.buffer.drain(..=end).collect();
                return Some((Ok(decode_line(&line)), reader));
            }

            if reader.done {
                if reader.buffer.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut reader.buffer);
                return Some((Ok(decode_line(&rest)), reader));
            }

            match reader.body.next().await {
                Some(Ok(chunk)) => reader.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    reader.done = true;
                    reader.buffer.clear();
                    return Some((Err(e), reader));
                }
                None => reader.done = true,
            }
        }
    })
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// The payload of a `data:` line, unless it is blank or the terminator.
pub(crate) fn data_segment(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == DONE_MARKER {
        return None;
    }
    Some(data)
}

/// Extract the list carried by one stream fragment, if any.
///
/// Only the nested-text form is honoured for fragments.
fn extract_fragment(fragment: usize, data: &str) -> Option<Vec<RecommendationItem>> {
    let document: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(fragment, error = %e, "skipping unparsable stream fragment");
            return None;
        }
    };

    if let Some(error) = rpc_error(&document) {
        tracing::warn!(fragment, code = error.code, error = %error, "stream fragment carries an error");
        return None;
    }

    let text = nested_text(&document)?;
    match serde_json::from_str::<Value>(text) {
        Ok(inner) => recommendations_of(&inner),
        Err(e) => {
            tracing::warn!(fragment, error = %e, "skipping fragment with unparsable tool text");
            None
        }
    }
}

/// `result.content[0].text`, when it is a non-empty string.
fn nested_text(document: &Value) -> Option<&str> {
    document
        .get("result")?
        .get("content")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// The `recommendations` member of a document, as a list.
///
/// Accepts a plain array or an object wrapping the array as `ranked_items`.
/// Returns `None` when the member is missing, null, or has any other shape.
fn recommendations_of(value: &Value) -> Option<Vec<RecommendationItem>> {
    match value.get("recommendations")? {
        Value::Null => None,
        Value::Array(values) => Some(items_from_values(values)),
        Value::Object(map) => match map.get("ranked_items") {
            Some(Value::Array(values)) => Some(items_from_values(values)),
            _ => {
                tracing::warn!("recommendations object has no ranked_items list");
                None
            }
        },
        other => {
            tracing::warn!(value = %other, "recommendations is not a list");
            None
        }
    }
}

/// The document's JSON-RPC `error` member, if it has a non-null one.
fn rpc_error(document: &Value) -> Option<JsonRpcError> {
    let error = document.get("error").filter(|e| !e.is_null())?;
    Some(
        serde_json::from_value(error.clone()).unwrap_or_else(|_| JsonRpcError {
            code: 0,
            message: error.to_string(),
            data: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(recommendations: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {
                "content": [{
                    "type": "text",
                    "text": json!({"session_id": "live", "recommendations": recommendations}).to_string()
                }]
            }
        })
    }

    fn titles(items: &[RecommendationItem]) -> Vec<&str> {
        items.iter().map(|i| i.display_title()).collect()
    }

    fn chunks(parts: Vec<String>) -> impl Stream<Item = std::result::Result<String, std::io::Error>> {
        futures::stream::iter(parts.into_iter().map(Ok))
    }

    #[test]
    fn test_mode_from_content_type() {
        assert_eq!(
            ResponseMode::from_content_type(Some("text/event-stream")),
            ResponseMode::EventStream
        );
        assert_eq!(
            ResponseMode::from_content_type(Some("text/event-stream; charset=utf-8")),
            ResponseMode::EventStream
        );
        assert_eq!(
            ResponseMode::from_content_type(Some("Text/Event-Stream")),
            ResponseMode::EventStream
        );
        assert_eq!(
            ResponseMode::from_content_type(Some("application/json")),
            ResponseMode::Document
        );
        assert_eq!(ResponseMode::from_content_type(None), ResponseMode::Document);
    }

    #[test]
    fn test_nested_text_extraction_is_exact() {
        let inner = json!([
            {"sku": "1", "title": "Shirt", "price": 19.99, "score": 0.9, "reason": "Real match", "url": "https://x/1.jpg"},
            {"sku": "2", "title": "Jeans", "price": 49.0, "score": 0.87, "url": "https://x/2.jpg"}
        ]);
        let items = extract_document(&nested(inner.clone())).unwrap();

        let expected: Vec<RecommendationItem> = serde_json::from_value(inner).unwrap();
        assert_eq!(items, expected);
        assert_eq!(items[0].price, Some(19.99));
        assert_eq!(items[1].reason, None);
    }

    #[test]
    fn test_direct_result_recommendations() {
        let doc = json!({"result": {"recommendations": [{"sku": "1", "title": "Shirt", "price": 19.99, "score": 0.9}]}});
        let items = extract_document(&doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].display_title(), "Shirt");
        assert_eq!(items[0].display_price(), "$19.99");
    }

    #[test]
    fn test_nested_text_wins_over_direct() {
        let mut doc = nested(json!([{"title": "Nested"}]));
        doc["result"]["recommendations"] = json!([{"title": "Direct"}]);
        let items = extract_document(&doc).unwrap();
        assert_eq!(titles(&items), vec!["Nested"]);
    }

    #[test]
    fn test_nested_text_without_recommendations_is_empty() {
        let doc = json!({"result": {"content": [{"type": "text", "text": "{\"session_id\":\"timeout\"}"}]}});
        assert!(extract_document(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_missing_both_is_empty_not_error() {
        assert!(extract_document(&json!({"result": {}})).unwrap().is_empty());
        assert!(extract_document(&json!({"jsonrpc": "2.0", "id": 2})).unwrap().is_empty());
        assert!(extract_document(&json!([])).unwrap().is_empty());
        assert!(
            extract_document(&json!({"result": {"content": []}}))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_ranked_items_wrapper() {
        let doc = nested(json!({"ranked_items": [{"sku": "a", "similarity": 0.91}]}));
        let items = extract_document(&doc).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].score, Some(0.91));
    }

    #[test]
    fn test_non_list_recommendations_is_empty() {
        let doc = json!({"result": {"recommendations": "none"}});
        assert!(extract_document(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_root() {
        let err = interpret_document("<html>oops</html>").unwrap_err();
        assert!(matches!(err, McpError::MalformedResponse(_)));
    }

    #[test]
    fn test_malformed_nested_text() {
        let doc = json!({"result": {"content": [{"type": "text", "text": "not json"}]}});
        let err = extract_document(&doc).unwrap_err();
        assert!(matches!(err, McpError::MalformedResponse(_)));
    }

    #[test]
    fn test_json_rpc_error_without_result_is_empty() {
        let doc = json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -32602, "message": "Invalid params"}});
        assert!(extract_document(&doc).unwrap().is_empty());
        assert!(interpret_document(&doc.to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_json_rpc_error_does_not_hide_result() {
        let doc = json!({
            "error": {"code": -1, "message": "partial"},
            "result": {"recommendations": [{"title": "Still here"}]}
        });
        assert_eq!(titles(&extract_document(&doc).unwrap()), vec!["Still here"]);
    }

    #[test]
    fn test_rpc_error_reads_typed_and_odd_shapes() {
        let typed = rpc_error(&json!({"error": {"code": -32000, "message": "busy", "data": {"retry": 5}}})).unwrap();
        assert_eq!(typed.code, -32000);
        assert_eq!(typed.message, "busy");
        assert_eq!(typed.data, Some(json!({"retry": 5})));

        let odd = rpc_error(&json!({"error": "boom"})).unwrap();
        assert_eq!(odd.code, 0);
        assert_eq!(odd.message, "\"boom\"");

        assert!(rpc_error(&json!({"error": null})).is_none());
        assert!(rpc_error(&json!({"result": {}})).is_none());
    }

    #[test]
    fn test_tool_error_flag() {
        let doc = json!({"result": {"isError": true, "content": [{"type": "text", "text": "inference timed out"}]}});
        match extract_document(&doc).unwrap_err() {
            McpError::ToolError(msg) => assert_eq!(msg, "inference timed out"),
            other => panic!("expected ToolError, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_document_calls_observer_once() {
        let body = nested(json!([{"title": "A"}])).to_string();
        let mut seen = Vec::new();
        let items = interpret_document_with(&body, |items| seen.push(items.len())).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn test_stream_last_fragment_wins() {
        let first = format!("data: {}\n\n", nested(json!([{"title": "Old"}])));
        let second = format!(
            "data: {}\n\n",
            nested(json!([{"title": "Coat"}, {"title": "Boots"}]))
        );
        let body = format!("{}{}", first, second);

        let mut updates = Vec::new();
        let items = interpret_stream(chunks(vec![body]), |items| updates.push(items.len()))
            .await
            .unwrap();

        assert_eq!(titles(&items), vec!["Coat", "Boots"]);
        assert_eq!(updates, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stream_frames_split_across_chunks() {
        let frame = format!("data: {}\n\n", nested(json!([{"title": "Split"}])));
        let (a, b) = frame.split_at(frame.len() / 2);

        let items = interpret_stream(chunks(vec![a.to_string(), b.to_string()]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Split"]);
    }

    #[tokio::test]
    async fn test_stream_bad_fragment_does_not_halt() {
        let good = format!("data: {}\n\n", nested(json!([{"title": "After"}])));
        let body = format!(
            "data: {{not json\n\ndata: {}\n\n{}",
            json!({"result": {"content": [{"type": "text", "text": "also not json"}]}}),
            good
        );

        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["After"]);
    }

    #[tokio::test]
    async fn test_stream_ignores_blank_done_and_listless_fragments() {
        let good = format!("data: {}\n\n", nested(json!([{"title": "Keep"}])));
        let progress = json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {"progress": 1}});
        let body = format!(
            "{}data: \n\ndata: {}\n\n: keep-alive\n\ndata: [DONE]\n\n",
            good, progress
        );

        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Keep"]);
    }

    #[tokio::test]
    async fn test_stream_empty_list_replaces() {
        let body = format!(
            "data: {}\n\ndata: {}\n\n",
            nested(json!([{"title": "Gone"}])),
            nested(json!([]))
        );

        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_fragment_is_skipped() {
        let body = format!(
            "data: {}\n\ndata: {}\n\n",
            nested(json!([{"title": "Kept"}])),
            json!({"jsonrpc": "2.0", "id": 2, "error": {"code": -1, "message": "late failure"}})
        );

        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Kept"]);
    }

    #[tokio::test]
    async fn test_stream_transport_failure_aborts() {
        let frame = format!("data: {}\n\n", nested(json!([{"title": "Partial"}])));
        let body = futures::stream::iter(vec![
            Ok(frame),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let err = interpret_stream(body, |_| {}).await.unwrap_err();
        assert!(matches!(err, McpError::Stream(_)));
    }

    #[tokio::test]
    async fn test_stream_with_no_fragments_is_empty() {
        let items = interpret_stream(chunks(Vec::new()), |_| {}).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_stream_one_fragment_per_line() {
        let body = format!(
            "data: {}\ndata: {}\n",
            nested(json!([{"title": "Old"}])),
            nested(json!([{"title": "Coat"}, {"title": "Boots"}]))
        );

        let mut updates = Vec::new();
        let items = interpret_stream(chunks(vec![body]), |items| updates.push(items.len()))
            .await
            .unwrap();

        assert_eq!(titles(&items), vec!["Coat", "Boots"]);
        assert_eq!(updates, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stream_single_line_without_blank_terminator() {
        let body = format!("data: {}\n", nested(json!([{"title": "Only"}])));
        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Only"]);
    }

    #[tokio::test]
    async fn test_stream_final_line_without_newline() {
        let body = format!(
            "data: {}\ndata: {}",
            nested(json!([{"title": "First"}])),
            nested(json!([{"title": "Last"}]))
        );
        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Last"]);
    }

    #[tokio::test]
    async fn test_stream_crlf_lines_and_no_space_after_colon() {
        let body = format!("data:{}\r\n\r\n", nested(json!([{"title": "Crlf"}])));
        let items = interpret_stream(chunks(vec![body]), |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Crlf"]);
    }

    #[tokio::test]
    async fn test_stream_multibyte_text_split_across_chunks() {
        let frame = format!("data: {}\n", nested(json!([{"title": "Café"}]))).into_bytes();
        let split = frame.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let body = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(frame[..split].to_vec()),
            Ok(frame[split..].to_vec()),
        ]);

        let items = interpret_stream(body, |_| {}).await.unwrap();
        assert_eq!(titles(&items), vec!["Café"]);
    }

    #[tokio::test]
    async fn test_frame_lines_yields_every_line() {
        let lines: Vec<String> = frame_lines(chunks(vec![
            "a\nb".to_string(),
            "c\r\n\nd".to_string(),
        ]))
        .map(|line| line.unwrap())
        .collect()
        .await;

        assert_eq!(lines, vec!["a", "bc", "", "d"]);
    }

    #[test]
    fn test_data_segment() {
        assert_eq!(data_segment("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_segment("data:{}"), Some("{}"));
        assert_eq!(data_segment("data: [DONE]"), None);
        assert_eq!(data_segment("data:   "), None);
        assert_eq!(data_segment("event: message"), None);
        assert_eq!(data_segment(": keep-alive"), None);
        assert_eq!(data_segment(""), None);
    }
}
