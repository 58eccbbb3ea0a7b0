//! Farm context - shared, cached farm telemetry for a conversational farm
//! assistant.
//!
//! A farm assistant answers questions with the help of a remote MCP tool
//! server. Fetching the farm summary from that server is slow and can fail,
//! so this crate keeps one copy per process and shares it:
//!
//! - [`SummaryCache`] - five-minute freshness, stale fallback on failure
//! - [`FetchCoordinator`] - one upstream call no matter how many callers
//! - [`Warmup`] - fire-and-forget fill at startup or on client prefetch
//! - [`prepare_turn`] - inject the summary into a conversation's first turn
//!
//! # Example
//!
//! ```ignore
//! use farm_context::{McpSummarySource, SummaryCache, SummaryConfig, Warmup, prepare_turn};
//! use std::sync::Arc;
//!
//! let config = SummaryConfig::from_env()?;
//! let source = Arc::new(McpSummarySource::from_config(&config)?);
//! let cache = Arc::new(SummaryCache::from_config(source, &config));
//!
//! if config.warm_on_start {
//!     Warmup::new(Arc::clone(&cache)).trigger();
//! }
//!
//! let context = prepare_turn(&cache, messages.len()).await;
//! ```

#![forbid(unsafe_code)]

mod config;
mod context;
pub mod mcp;
pub mod summary;

#[cfg(test)]
mod test_utils;

pub use config::{DEFAULT_TTL, SummaryConfig};
pub use context::{FARM_SUMMARY_KEY, RuntimeContext, prepare_turn};
pub use summary::{
    CacheEntry, FetchCoordinator, McpSummarySource, PrefetchResponse, SummaryCache,
    SummarySource, Warmup,
};
