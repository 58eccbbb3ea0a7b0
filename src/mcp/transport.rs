//! MCP transports.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};

/// Header carrying the session assigned by a streamable-HTTP server.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Trait for MCP transports.
///
/// Transports move JSON-RPC messages to an MCP server and back. They apply
/// no timeout of their own beyond what the underlying client is built with.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered, the response
    /// cannot be parsed, or the server answers with a JSON-RPC error.
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification; no response is expected.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be delivered.
    async fn notify(&self, request: JsonRpcRequest) -> Result<()>;
}

/// Streamable-HTTP transport.
///
/// Every message is a POST to one endpoint. The server answers either with a
/// JSON body or with an SSE stream whose `data:` lines carry the response.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    /// Create a transport with a default reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(client, url))
    }

    /// Create a transport over a caller-configured client (e.g. one with a
    /// request timeout). The client must send the JSON/SSE accept headers.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session assigned by the server during `initialize`, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn post(&self, request: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut builder = self.client.post(&self.url).json(request);
        if let Some(session) = self.session_id() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("HTTP request to {} failed", self.url))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(session.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("MCP server returned HTTP {status}: {body}");
        }

        Ok(response)
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn send(&self, mut request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = RequestId::Number(self.next_request_id());
        request.id = Some(id.clone());

        let response = self.post(&request).await?;
        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/event-stream"));
        let body = response
            .text()
            .await
            .context("Failed to read MCP response body")?;

        let response = if is_sse {
            parse_sse_response(&body, &id)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&body)
                .with_context(|| format!("Failed to parse MCP response: {body}"))?
        };

        if let Some(ref error) = response.error {
            bail!("JSON-RPC error {}: {}", error.code, error.message);
        }

        Ok(response)
    }

    async fn notify(&self, request: JsonRpcRequest) -> Result<()> {
        self.post(&request).await.map(drop)
    }
}

/// Find the response for `id` among the `data:` lines of an SSE body.
///
/// # Errors
///
/// Returns an error if no event carries a matching JSON-RPC response.
pub fn parse_sse_response(body: &str, id: &RequestId) -> Result<JsonRpcResponse> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(data.trim_start()).ok())
        .find(|response| response.id.as_ref().is_none_or(|rid| rid == id))
        .context("No JSON-RPC response in SSE stream")
}
