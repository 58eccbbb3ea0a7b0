//! Farm-summary acquisition and caching.
//!
//! The farm summary is a short text snapshot (herd, alerts, pasture) produced
//! by a slow, fallible remote tool. This module shares one copy of it across
//! every request handler in the process:
//!
//! - [`SummarySource`] - the upstream tool call ([`McpSummarySource`] over MCP)
//! - [`FetchCoordinator`] - at most one fetch in flight; concurrent callers
//!   share its outcome
//! - [`SummaryCache`] - time-to-live freshness with stale fallback
//! - [`Warmup`] - fire-and-forget population at startup or on client prefetch
//!
//! # Example
//!
//! ```ignore
//! use farm_context::summary::{McpSummarySource, SummaryCache, Warmup};
//! use farm_context::SummaryConfig;
//! use std::sync::Arc;
//!
//! let config = SummaryConfig::from_env()?;
//! let source = Arc::new(McpSummarySource::from_config(&config)?);
//! let cache = Arc::new(SummaryCache::from_config(source, &config));
//!
//! Warmup::new(Arc::clone(&cache)).trigger();
//!
//! // Later, in a request handler:
//! if let Some(summary) = cache.get().await {
//!     println!("{summary}");
//! }
//! ```

pub mod anchor;
pub mod cache;
pub mod coordinator;
pub mod source;
pub mod warmup;

pub use cache::{CACHE_SLOT, CacheEntry, SummaryCache};
pub use coordinator::{Demand, FetchCoordinator, InFlight};
pub use source::{McpSummarySource, SummarySource, extract_summary};
pub use warmup::{PrefetchResponse, Warmup};
