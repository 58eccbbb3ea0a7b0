//! Upstream sources of the farm summary.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::SummaryConfig;
use crate::mcp::{HttpTransport, McpClient, McpTransport, ToolCallEnvelope};

/// The remote tool that produces a farm summary.
///
/// Implementations make exactly one upstream call per `fetch` and do not
/// retry; the cache above them decides what a failure means.
#[async_trait]
pub trait SummarySource: Send + Sync {
    /// Call the tool and return its raw result envelope.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a malformed response.
    async fn fetch(&self) -> Result<ToolCallEnvelope>;
}

/// Summary text carried by an envelope, if it carries any.
///
/// Error envelopes and envelopes without a non-empty `text` item yield
/// `None`.
#[must_use]
pub fn extract_summary(envelope: &ToolCallEnvelope) -> Option<String> {
    if envelope.is_error {
        return None;
    }
    envelope.first_text().map(str::to_string)
}

/// Fetch once and collapse every failure mode to `None`.
pub(crate) async fn fetch_summary(source: &dyn SummarySource) -> Option<String> {
    match source.fetch().await {
        Ok(envelope) if envelope.is_error => {
            log::error!(
                "Farm summary returned error: {}",
                envelope.first_text().unwrap_or("<no message>")
            );
            None
        }
        Ok(envelope) => {
            let summary = extract_summary(&envelope);
            if summary.is_none() {
                log::warn!("Farm summary response carried no text content");
            }
            summary
        }
        Err(e) => {
            log::error!("Failed to fetch farm summary: {e:#}");
            None
        }
    }
}

/// [`SummarySource`] calling a tool on an MCP server.
///
/// The connection is opened on the first fetch. A failed handshake is not
/// remembered, so the next fetch tries again.
pub struct McpSummarySource<T: McpTransport> {
    transport: Arc<T>,
    server_name: String,
    tool_name: String,
    arguments: Value,
    client: OnceCell<McpClient<T>>,
}

impl McpSummarySource<HttpTransport> {
    /// Source talking streamable HTTP to `config.server_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &SummaryConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.server_url.clone())?);
        Ok(Self::new(transport, config))
    }
}

impl<T: McpTransport> McpSummarySource<T> {
    #[must_use]
    pub fn new(transport: Arc<T>, config: &SummaryConfig) -> Self {
        Self {
            transport,
            server_name: config.server_name.clone(),
            tool_name: config.tool_name.clone(),
            arguments: config.tool_arguments.clone(),
            client: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&McpClient<T>> {
        self.client
            .get_or_try_init(|| {
                McpClient::connect(Arc::clone(&self.transport), self.server_name.clone())
            })
            .await
    }
}

#[async_trait]
impl<T: McpTransport + 'static> SummarySource for McpSummarySource<T> {
    async fn fetch(&self) -> Result<ToolCallEnvelope> {
        let client = self.client().await?;
        client
            .call_tool(&self.tool_name, self.arguments.clone())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolContent;
    use crate::test_utils::{MockSource, MockTransport};

    #[test]
    fn test_extract_summary_text() {
        let envelope = ToolCallEnvelope::text("Farm X: 120 cows, 2 alerts");
        assert_eq!(
            extract_summary(&envelope).as_deref(),
            Some("Farm X: 120 cows, 2 alerts")
        );
    }

    #[test]
    fn test_extract_summary_error_envelope() {
        assert_eq!(extract_summary(&ToolCallEnvelope::error("boom")), None);
    }

    #[test]
    fn test_extract_summary_skips_non_text() {
        let envelope = ToolCallEnvelope {
            content: vec![
                ToolContent::Other,
                ToolContent::Text {
                    text: "herd ok".to_string(),
                },
            ],
            is_error: false,
        };
        assert_eq!(extract_summary(&envelope).as_deref(), Some("herd ok"));

        let empty = ToolCallEnvelope {
            content: vec![ToolContent::Other],
            is_error: false,
        };
        assert_eq!(extract_summary(&empty), None);
    }

    #[tokio::test]
    async fn test_fetch_summary_swallows_errors() {
        let source = MockSource::new();
        source.push_failure("connection refused");
        source.push_envelope(ToolCallEnvelope::error("upstream down"));
        source.push_envelope(ToolCallEnvelope::default());

        assert_eq!(fetch_summary(&source).await, None);
        assert_eq!(fetch_summary(&source).await, None);
        assert_eq!(fetch_summary(&source).await, None);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_mcp_source_calls_configured_tool() -> Result<()> {
        let transport = Arc::new(MockTransport::farm("Farm X: 120 cows, 2 alerts"));
        let source = McpSummarySource::new(Arc::clone(&transport), &SummaryConfig::default());
        assert!(!source.is_connected());

        let first = source.fetch().await?;
        let second = source.fetch().await?;

        assert!(source.is_connected());
        assert_eq!(first.first_text(), Some("Farm X: 120 cows, 2 alerts"));
        assert_eq!(second.first_text(), first.first_text());
        assert_eq!(
            transport.methods(),
            vec![
                "initialize",
                "notifications/initialized",
                "tools/call",
                "tools/call"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_mcp_source_retries_failed_handshake() -> Result<()> {
        let transport = Arc::new(MockTransport::farm("summary"));
        transport.fail_next_initialize();
        let source = McpSummarySource::new(Arc::clone(&transport), &SummaryConfig::default());

        assert!(source.fetch().await.is_err());
        assert!(!source.is_connected());

        let envelope = source.fetch().await?;
        assert_eq!(envelope.first_text(), Some("summary"));
        Ok(())
    }
}
