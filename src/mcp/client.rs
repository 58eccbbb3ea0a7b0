//! MCP client implementation.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

use super::protocol::{
    Implementation, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ToolCallEnvelope, ToolCallParams, ToolDefinition, ToolsListResult,
};
use super::transport::McpTransport;

/// MCP protocol version.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP client bound to one server.
///
/// # Example
///
/// ```ignore
/// use farm_context::mcp::{HttpTransport, McpClient};
///
/// let transport = Arc::new(HttpTransport::new("https://farm.example/mcp")?);
/// let client = McpClient::connect(transport, "halter").await?;
/// let envelope = client.call_tool("halter_get_farm_summary", json!({"include": []})).await?;
/// ```
pub struct McpClient<T: McpTransport> {
    transport: Arc<T>,
    server_name: String,
    server_info: InitializeResult,
}

impl<T: McpTransport> McpClient<T> {
    /// Connect to a server and complete the initialize handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects or fails initialization.
    pub async fn connect(transport: Arc<T>, server_name: impl Into<String>) -> Result<Self> {
        let server_name = server_name.into();
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        };

        let request = JsonRpcRequest::new("initialize", Some(serde_json::to_value(&params)?), 0);
        let response = transport
            .send(request)
            .await
            .with_context(|| format!("Failed to initialize MCP server {server_name}"))?;
        let server_info: InitializeResult = decode_result(response, "initialize")?;

        // Servers may reject the notification when stateless; the session is
        // already usable at this point.
        let notification = JsonRpcRequest::notification("notifications/initialized", None);
        if let Err(e) = transport.notify(notification).await {
            log::debug!("MCP server {server_name} did not accept initialized notification: {e}");
        }

        log::debug!(
            "Connected to MCP server {server_name} ({} protocol {})",
            server_info.server_info.name,
            server_info.protocol_version
        );

        Ok(Self {
            transport,
            server_name,
            server_info,
        })
    }

    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[must_use]
    pub const fn server_info(&self) -> &InitializeResult {
        &self.server_info
    }

    /// List available tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let request = JsonRpcRequest::new("tools/list", None, 0);
        let response = self.transport.send(request).await?;
        let result: ToolsListResult = decode_result(response, "tools/list")?;
        Ok(result.tools)
    }

    /// Call a tool and return its result envelope.
    ///
    /// An envelope flagged `isError` is still `Ok`; interpreting it is up to
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the call cannot be completed or the result is
    /// malformed.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallEnvelope> {
        let params = ToolCallParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };

        let request = JsonRpcRequest::new("tools/call", Some(serde_json::to_value(&params)?), 0);
        let response = self
            .transport
            .send(request)
            .await
            .with_context(|| format!("Tool call {name} failed"))?;

        decode_result(response, "tools/call")
    }
}

fn decode_result<R: DeserializeOwned>(response: JsonRpcResponse, method: &str) -> Result<R> {
    response
        .result
        .map(serde_json::from_value)
        .transpose()
        .with_context(|| format!("Failed to parse {method} response"))?
        .with_context(|| format!("{method} response missing result"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolContent;
    use crate::test_utils::MockTransport;

    #[tokio::test]
    async fn test_connect_performs_handshake() -> Result<()> {
        let transport = Arc::new(MockTransport::farm("Farm X: 120 cows, 2 alerts"));
        let client = McpClient::connect(Arc::clone(&transport), "halter").await?;

        assert_eq!(client.server_name(), "halter");
        assert_eq!(client.server_info().server_info.name, "mock-farm");
        assert_eq!(
            transport.methods(),
            vec!["initialize", "notifications/initialized"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_call_tool_returns_envelope() -> Result<()> {
        let transport = Arc::new(MockTransport::farm("Farm X: 120 cows, 2 alerts"));
        let client = McpClient::connect(Arc::clone(&transport), "halter").await?;

        let envelope = client
            .call_tool("halter_get_farm_summary", json!({"include": []}))
            .await?;

        assert!(!envelope.is_error);
        assert_eq!(
            envelope.content,
            vec![ToolContent::Text {
                text: "Farm X: 120 cows, 2 alerts".to_string()
            }]
        );
        let last = transport.last_params().expect("params recorded");
        assert_eq!(last["name"], "halter_get_farm_summary");
        assert_eq!(last["arguments"], json!({"include": []}));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_tools() -> Result<()> {
        let transport = Arc::new(MockTransport::farm("summary"));
        let client = McpClient::connect(transport, "halter").await?;

        let tools = client.list_tools().await?;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "halter_get_farm_summary");
        Ok(())
    }

    #[test]
    fn test_missing_result_is_error() {
        let response = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: None,
            id: None,
        };

        let decoded: Result<ToolCallEnvelope> = decode_result(response, "tools/call");
        assert!(decoded.is_err());
    }
}
