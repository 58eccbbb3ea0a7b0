//! Best-effort cache warm-up.
//!
//! Warm-up runs the normal fetch path ahead of the first conversation so
//! that request does not pay the upstream latency. It is fire-and-forget:
//! callers never wait and never see a failure.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::cache::SummaryCache;
use super::coordinator::Demand;

/// Body returned to a client that asked the server to prefetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchResponse {
    pub status: String,
}

impl PrefetchResponse {
    #[must_use]
    pub fn prefetching() -> Self {
        Self {
            status: "prefetching".to_string(),
        }
    }
}

/// Warm-up trigger for a [`SummaryCache`].
#[derive(Clone)]
pub struct Warmup {
    cache: Arc<SummaryCache>,
}

impl Warmup {
    #[must_use]
    pub const fn new(cache: Arc<SummaryCache>) -> Self {
        Self { cache }
    }

    /// Start filling the cache unless it is already warm or filling.
    ///
    /// Returns `true` only when this call started a fetch. Safe to call any
    /// number of times from any trigger; redundant calls are no-ops. Outside
    /// a Tokio runtime nothing is started.
    pub fn trigger(&self) -> bool {
        if tokio::runtime::Handle::try_current().is_err() {
            log::warn!("Farm summary warmup skipped: no async runtime");
            return false;
        }

        match self.cache.demand() {
            Demand::Ready(_) => {
                log::debug!("Farm summary already warm");
                false
            }
            Demand::Joined(_) => {
                log::debug!("Farm summary warmup already in progress");
                false
            }
            Demand::Started(fetch) => {
                tokio::spawn(async move {
                    match fetch.await {
                        Some(_) => log::info!("Farm summary warmup complete"),
                        None => log::warn!("Farm summary warmup obtained no summary"),
                    }
                });
                true
            }
        }
    }

    /// Handle a client prefetch request: trigger and answer immediately.
    #[must_use]
    pub fn prefetch(&self) -> PrefetchResponse {
        self.trigger();
        PrefetchResponse::prefetching()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<SummaryCache> {
        &self.cache
    }
}
