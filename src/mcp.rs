//! Model Context Protocol (MCP) client support.
//!
//! Just enough of MCP to call a remote farm-data tool:
//!
//! - [`McpClient`] - initialize handshake, tool discovery and tool calls
//! - [`McpTransport`] - trait for transport implementations
//! - [`HttpTransport`] - streamable-HTTP transport (JSON or SSE responses)
//! - [`ToolCallEnvelope`] - the `tools/call` result (`isError` + content items)

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{MCP_PROTOCOL_VERSION, McpClient};
pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, ToolCallEnvelope, ToolContent,
    ToolDefinition,
};
pub use transport::{HttpTransport, McpTransport};
