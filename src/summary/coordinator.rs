//! De-duplication of concurrent summary fetches.
//!
//! At most one upstream fetch is in flight at a time. It runs as its own
//! Tokio task, so it settles even if every caller stops waiting, and a drop
//! guard inside that task clears the pending slot on every exit path:
//! success, failure, or panic.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::source::{SummarySource, fetch_summary};

/// Handle to the in-flight fetch. Every clone resolves to the same outcome.
pub type InFlight = Shared<BoxFuture<'static, Option<String>>>;

/// What a caller got when it asked for the summary.
pub enum Demand {
    /// Usable without a fetch.
    Ready(String),
    /// Joined a fetch someone else started.
    Joined(InFlight),
    /// Started a new fetch.
    Started(InFlight),
}

impl Demand {
    /// Wait for the value behind this demand.
    pub async fn resolve(self) -> Option<String> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Joined(fetch) | Self::Started(fetch) => fetch.await,
        }
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

struct Pending {
    id: u64,
    fetch: InFlight,
}

type PendingSlot = Arc<Mutex<Option<Pending>>>;

/// Clears the pending slot when the fetch task ends, however it ends.
struct ClearPending {
    slot: PendingSlot,
    id: u64,
}

impl Drop for ClearPending {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|pending| pending.id == self.id) {
            *slot = None;
        }
    }
}

/// Runs the upstream call and collapses concurrent demand onto it.
pub struct FetchCoordinator {
    source: Arc<dyn SummarySource>,
    pending: PendingSlot,
    next_id: AtomicU64,
}

impl FetchCoordinator {
    #[must_use]
    pub fn new(source: Arc<dyn SummarySource>) -> Self {
        Self {
            source,
            pending: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Whether a fetch is currently in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Join the in-flight fetch or start one, and wait for its outcome.
    ///
    /// Failures come back as `None`, never as an error.
    pub async fn acquire(&self) -> Option<String> {
        self.demand(|| None, |_| {}).resolve().await
    }

    /// Decide how to satisfy a caller without waiting.
    ///
    /// `ready` runs while the pending slot is held and short-circuits the
    /// fetch when it yields a value; this closes the gap between a caller's
    /// own freshness check and a fetch settling in between. `on_success`
    /// runs inside the fetch task before the pending slot is cleared, and
    /// only when this call starts the fetch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn demand<R, S>(&self, ready: R, on_success: S) -> Demand
    where
        R: FnOnce() -> Option<String>,
        S: FnOnce(&str) + Send + 'static,
    {
        let mut slot = self.lock();

        if let Some(pending) = slot.as_ref() {
            log::debug!("Farm summary fetch in progress, waiting...");
            return Demand::Joined(pending.fetch.clone());
        }

        if let Some(value) = ready() {
            return Demand::Ready(value);
        }

        log::debug!("Farm summary cache miss, fetching...");
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let source = Arc::clone(&self.source);
        let guard = ClearPending {
            slot: Arc::clone(&self.pending),
            id,
        };

        let task = tokio::spawn(async move {
            let _guard = guard;
            let summary = fetch_summary(source.as_ref()).await;
            if let Some(ref value) = summary {
                on_success(value);
            }
            summary
        });

        let fetch: InFlight = async move {
            task.await.unwrap_or_else(|e| {
                log::error!("Farm summary fetch task failed: {e}");
                None
            })
        }
        .boxed()
        .shared();

        *slot = Some(Pending {
            id,
            fetch: fetch.clone(),
        });
        Demand::Started(fetch)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
