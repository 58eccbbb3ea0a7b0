//! Configuration for farm-summary acquisition.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Default time-to-live of a cached summary (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Configuration for fetching and caching the farm summary.
///
/// # Example
///
/// ```
/// use farm_context::SummaryConfig;
/// use std::time::Duration;
///
/// let config = SummaryConfig::default()
///     .with_server_url("https://farm.example/mcp")
///     .with_ttl(Duration::from_secs(60));
/// assert_eq!(config.ttl(), Duration::from_secs(60));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Streamable-HTTP endpoint of the MCP server.
    pub server_url: String,

    /// Name used for the server in logs.
    /// Default: "halter"
    pub server_name: String,

    /// Tool producing the summary.
    /// Default: "`halter_get_farm_summary`"
    pub tool_name: String,

    /// Arguments passed to the tool.
    /// Default: `{"include": []}`
    pub tool_arguments: Value,

    /// Seconds a fetched summary stays fresh.
    /// Default: 300
    pub ttl_secs: u64,

    /// Whether the process warms the cache at startup.
    /// Default: true
    pub warm_on_start: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080/mcp".to_string(),
            server_name: "halter".to_string(),
            tool_name: "halter_get_farm_summary".to_string(),
            tool_arguments: json!({ "include": [] }),
            ttl_secs: DEFAULT_TTL.as_secs(),
            warm_on_start: true,
        }
    }
}

impl SummaryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `FARM_MCP_URL`, `FARM_MCP_SERVER_NAME`,
    /// `FARM_SUMMARY_TOOL`, `FARM_SUMMARY_TTL_SECS` and
    /// `FARM_SUMMARY_WARM_ON_START`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("FARM_MCP_URL") {
            config.server_url = url;
        }
        if let Some(name) = lookup("FARM_MCP_SERVER_NAME") {
            config.server_name = name;
        }
        if let Some(tool) = lookup("FARM_SUMMARY_TOOL") {
            config.tool_name = tool;
        }
        if let Some(ttl) = lookup("FARM_SUMMARY_TTL_SECS") {
            config.ttl_secs = ttl
                .trim()
                .parse()
                .with_context(|| format!("FARM_SUMMARY_TTL_SECS is not a number: {ttl}"))?;
        }
        if let Some(warm) = lookup("FARM_SUMMARY_WARM_ON_START") {
            config.warm_on_start = warm
                .trim()
                .parse()
                .with_context(|| format!("FARM_SUMMARY_WARM_ON_START is not a bool: {warm}"))?;
        }

        Ok(config)
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    #[must_use]
    pub fn with_tool(mut self, name: impl Into<String>, arguments: Value) -> Self {
        self.tool_name = name.into();
        self.tool_arguments = arguments;
        self
    }

    /// Set the TTL. Sub-second precision is dropped.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    #[must_use]
    pub const fn with_warm_on_start(mut self, warm: bool) -> Self {
        self.warm_on_start = warm;
        self
    }
}
