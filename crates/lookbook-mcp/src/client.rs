//! HTTP client for the remote recommendation tool.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use url::Url;

use crate::encoder::UploadedImage;
use crate::error::{McpError, Result};
use crate::interpreter;
use crate::protocol::{
    ACCEPT_BOTH, CallToolParams, ClientInfo, InitializeParams, JsonRpcNotification,
    JsonRpcRequest, SESSION_HEADER, methods,
};
use crate::recommendation::RecommendationItem;
use crate::session::{self, Session};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/mcp";

/// Default timeout for the handshake.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the tool call, which may stream.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for one MCP endpoint.
///
/// Cloning is cheap; clones share the connection pool and the request id
/// counter.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    stream_timeout: Duration,
    client_info: ClientInfo,
    request_id: AtomicU64,
}

impl McpClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for the default local endpoint.
    pub fn localhost() -> Result<Self> {
        Self::builder().endpoint(DEFAULT_ENDPOINT).build()
    }

    /// The endpoint every request is posted to.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Identity announced in the handshake.
    pub fn client_info(&self) -> &ClientInfo {
        &self.inner.client_info
    }

    fn next_request_id(&self) -> u64 {
        self.inner.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Start a POST to the endpoint. Every request, without exception,
    /// carries the dual `Accept` value.
    fn post<B>(&self, body: &B, session: Option<&Session>, timeout: Duration) -> reqwest::RequestBuilder
    where
        B: serde::Serialize + ?Sized,
    {
        let mut request = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_BOTH))
            .json(body)
            .timeout(timeout);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session.id());
        }
        request
    }

    /// Perform the initialize handshake and return the session it opened.
    ///
    /// Fails with [`McpError::NegotiationFailed`] on a non-success status and
    /// [`McpError::MissingSessionToken`] when the reply has no usable
    /// `mcp-session-id` header.
    pub async fn negotiate(&self) -> Result<Session> {
        let params = InitializeParams::new(self.inner.client_info.clone());
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            methods::INITIALIZE,
            Some(serde_json::to_value(&params)?),
        );

        tracing::debug!(endpoint = %self.inner.endpoint, id = request.id, "sending initialize");
        let response = self.post(&request, None, self.inner.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "initialize rejected");
            return Err(McpError::NegotiationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(McpError::MissingSessionToken)?;

        let session = Session::new(token, session::read_handshake(response).await);

        tracing::info!(
            session = %session.id(),
            server = session.server_info().map(|s| s.name.as_str()).unwrap_or("unknown"),
            protocol = session.protocol_version().unwrap_or("unknown"),
            "MCP session initialized"
        );

        self.notify_initialized(&session).await;
        Ok(session)
    }

    /// Send `notifications/initialized`. The server's answer does not matter
    /// to the submission, so failures are only logged.
    async fn notify_initialized(&self, session: &Session) {
        let notification = JsonRpcNotification::new(methods::INITIALIZED, None);
        match self
            .post(&notification, Some(session), self.inner.timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::trace!(status = response.status().as_u16(), "initialized notification accepted");
            }
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "initialized notification rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "initialized notification failed");
            }
        }
    }

    /// Call the recommendation tool with an encoded image.
    ///
    /// Returns the raw response for [`interpreter::interpret`]; the body is
    /// not read here because it may be an open event stream.
    pub async fn invoke(&self, session: &Session, image: &UploadedImage) -> Result<reqwest::Response> {
        let params = CallToolParams::recommendation(image.encoded());
        let request = JsonRpcRequest::new(
            self.next_request_id(),
            methods::TOOLS_CALL,
            Some(serde_json::to_value(&params)?),
        );

        tracing::debug!(
            session = %session.id(),
            id = request.id,
            image = %image.name(),
            bytes = image.len(),
            "calling recommendation tool"
        );
        let response = self
            .post(&request, Some(session), self.inner.stream_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "tool call rejected");
            return Err(McpError::InvocationFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Negotiate, invoke, and interpret in one call.
    pub async fn recommend<F>(&self, image: &UploadedImage, on_update: F) -> Result<Vec<RecommendationItem>>
    where
        F: FnMut(&[RecommendationItem]),
    {
        let session = self.negotiate().await?;
        let response = self.invoke(&session, image).await?;
        interpreter::interpret(response, on_update).await
    }
}

/// Builder for creating an [`McpClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: Option<String>,
    timeout: Duration,
    stream_timeout: Duration,
    client_info: ClientInfo,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            client_info: ClientInfo::default(),
            user_agent: None,
        }
    }

    /// Set the MCP endpoint URL.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Set the handshake timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the tool call timeout.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set the identity sent in `clientInfo`.
    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo::new(name, version);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<McpClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| McpError::Config("endpoint is required".to_string()))?;
        let endpoint = Url::parse(&endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(McpError::Config(format!(
                "unsupported endpoint scheme '{}'",
                endpoint.scheme()
            )));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("lookbook-mcp/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(McpClient {
            inner: Arc::new(ClientInner {
                http,
                endpoint,
                timeout: self.timeout,
                stream_timeout: self.stream_timeout,
                client_info: self.client_info,
                request_id: AtomicU64::new(1),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
