use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::mcp::{McpTransport, ToolCallEnvelope};
use crate::summary::SummarySource;
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// ===================
// Mock Summary Source
// ===================

enum Scripted {
    Envelope(ToolCallEnvelope),
    Failure(String),
    Panic,
}

/// Source replaying scripted outcomes in order; fails once the script runs
/// out.
pub struct MockSource {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Every fetch sleeps this long (on the Tokio clock) before answering.
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_envelope(&self, envelope: ToolCallEnvelope) {
        self.push(Scripted::Envelope(envelope));
    }

    pub fn push_failure(&self, message: &str) {
        self.push(Scripted::Failure(message.to_string()));
    }

    pub fn push_panic(&self) {
        self.push(Scripted::Panic);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, outcome: Scripted) {
        self.script.lock().expect("lock poisoned").push_back(outcome);
    }
}

#[async_trait]
impl SummarySource for MockSource {
    async fn fetch(&self) -> Result<ToolCallEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().expect("lock poisoned").pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            Some(Scripted::Envelope(envelope)) => Ok(envelope),
            Some(Scripted::Failure(message)) => Err(anyhow!(message)),
            Some(Scripted::Panic) => panic!("scripted source panic"),
            None => bail!("mock source script exhausted"),
        }
    }
}

// ===================
// Mock MCP Transport
// ===================

/// In-process MCP server exposing one farm-summary tool.
pub struct MockTransport {
    summary: String,
    requests: Mutex<Vec<JsonRpcRequest>>,
    fail_initialize: AtomicBool,
}

impl MockTransport {
    pub fn farm(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            requests: Mutex::new(Vec::new()),
            fail_initialize: AtomicBool::new(false),
        }
    }

    pub fn fail_next_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }

    pub fn last_params(&self) -> Option<Value> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .last()
            .and_then(|r| r.params.clone())
    }

    fn record(&self, request: &JsonRpcRequest) {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());
    }
}

#[async_trait]
impl McpTransport for MockTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.record(&request);
        let id = request.id.clone().unwrap_or(RequestId::Number(0));

        let result = match request.method.as_str() {
            "initialize" => {
                if self.fail_initialize.swap(false, Ordering::SeqCst) {
                    bail!("HTTP 503: server starting");
                }
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "mock-farm", "version": "0.0.1"}
                })
            }
            "tools/list" => json!({
                "tools": [{
                    "name": "halter_get_farm_summary",
                    "description": "Farm overview",
                    "inputSchema": {"type": "object"}
                }]
            }),
            "tools/call" => serde_json::to_value(ToolCallEnvelope::text(self.summary.clone()))?,
            other => bail!("JSON-RPC error -32601: unknown method {other}"),
        };

        Ok(JsonRpcResponse::success(id, result))
    }

    async fn notify(&self, request: JsonRpcRequest) -> Result<()> {
        self.record(&request);
        Ok(())
    }
}
