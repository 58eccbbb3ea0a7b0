//! Time-to-live cache over the farm summary with stale fallback.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use super::anchor;
use super::coordinator::{Demand, FetchCoordinator};
use super::source::SummarySource;
use crate::config::SummaryConfig;

/// Well-known process-wide slot of the shared cache.
pub const CACHE_SLOT: &str = "farm_summary_cache";

/// A fetched summary together with the instant it was fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,
    pub fetched_at: Instant,
}

impl CacheEntry {
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

type EntrySlot = Arc<RwLock<Option<CacheEntry>>>;

/// The shared farm summary.
///
/// Construct one per process and hand an `Arc` of it to every request
/// handler. [`SummaryCache::get`] never fails: it answers with a fresh value,
/// a stale one when a refresh fails, or `None`.
pub struct SummaryCache {
    entry: EntrySlot,
    coordinator: FetchCoordinator,
    ttl: Duration,
}

impl SummaryCache {
    #[must_use]
    pub fn new(source: Arc<dyn SummarySource>, ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            coordinator: FetchCoordinator::new(source),
            ttl,
        }
    }

    #[must_use]
    pub fn from_config(source: Arc<dyn SummarySource>, config: &SummaryConfig) -> Self {
        Self::new(source, config.ttl())
    }

    /// The cache anchored in the process-wide [`CACHE_SLOT`], created from
    /// `config` and `source` on first use.
    ///
    /// Code that gets re-initialised within one process recovers the same
    /// cache instead of starting cold; later arguments are ignored.
    pub fn anchored(
        config: &SummaryConfig,
        source: impl FnOnce() -> Arc<dyn SummarySource>,
    ) -> Arc<Self> {
        anchor::anchored(CACHE_SLOT, || Self::from_config(source(), config))
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current summary, fetching when the cached one is missing or stale.
    pub async fn get(&self) -> Option<String> {
        if let Some(value) = self.fresh_value() {
            log::debug!("Farm summary cache hit");
            return Some(value);
        }

        match self.demand().resolve().await {
            Some(value) => Some(value),
            None => {
                let stale = self.peek().map(|entry| entry.value);
                if stale.is_some() {
                    log::warn!("Farm summary refresh failed, serving stale value");
                }
                stale
            }
        }
    }

    /// Join or start a refresh without waiting for it.
    ///
    /// Yields [`Demand::Ready`] when a fresh value is already cached.
    pub fn demand(&self) -> Demand {
        let entry = Arc::clone(&self.entry);
        self.coordinator.demand(
            || self.fresh_value(),
            move |value| {
                *entry.write().unwrap_or_else(PoisonError::into_inner) = Some(CacheEntry {
                    value: value.to_string(),
                    fetched_at: Instant::now(),
                });
                log::info!("Farm summary cached successfully");
            },
        )
    }

    /// Cached entry, fresh or stale, without fetching.
    #[must_use]
    pub fn peek(&self) -> Option<CacheEntry> {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.fresh_value().is_some()
    }

    /// Whether a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_pending()
    }

    /// Drop the cached entry. A refresh already in flight still lands.
    pub fn invalidate(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn fresh_value(&self) -> Option<String> {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }
}
