//! Per-turn runtime context handed to the farm assistant.
//!
//! The first turn of a conversation gets the cached farm summary pre-loaded
//! so the agent can answer most questions without calling the farm tool
//! itself. Later turns already carry it in the conversation and are left
//! alone.

use serde_json::Value;
use std::collections::HashMap;

use crate::summary::SummaryCache;

/// Key under which the pre-loaded summary is stored.
pub const FARM_SUMMARY_KEY: &str = "farmSummary";

/// Values made available to the agent for one turn.
#[derive(Clone, Debug, Default)]
pub struct RuntimeContext {
    values: HashMap<String, Value>,
}

impl RuntimeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The pre-loaded farm summary, if one was injected.
    #[must_use]
    pub fn farm_summary(&self) -> Option<&str> {
        self.get(FARM_SUMMARY_KEY).and_then(Value::as_str)
    }

    /// Instruction block presenting the pre-loaded summary to the agent.
    ///
    /// The block tells the agent not to re-fetch the summary unless the user
    /// asks for updated data.
    #[must_use]
    pub fn preloaded_summary_section(&self) -> Option<String> {
        let summary = self.farm_summary()?;
        Some(format!(
            "## Current Farm Status (Pre-loaded)\n\
             The farm summary below was automatically fetched - DO NOT call the farm summary \
             tool again unless the user explicitly asks for refreshed/updated data. This \
             overview and alerts data is sufficient for most questions.\n\n\
             {summary}\n\n"
        ))
    }
}

/// Build the runtime context for a turn.
///
/// Only the first turn (`message_count == 1`) consults the cache. A missing
/// summary is not an error; the turn simply runs without it.
pub async fn prepare_turn(cache: &SummaryCache, message_count: usize) -> RuntimeContext {
    let mut context = RuntimeContext::new();

    if message_count == 1 {
        if let Some(summary) = cache.get().await {
            context.set(FARM_SUMMARY_KEY, summary);
        }
    }

    log::debug!(
        "RuntimeContext farmSummary: {}",
        if context.contains(FARM_SUMMARY_KEY) {
            "SET"
        } else {
            "NOT SET"
        }
    );
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolCallEnvelope;
    use crate::summary::SummarySource;
    use crate::test_utils::MockSource;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache_with(source: &Arc<MockSource>) -> SummaryCache {
        SummaryCache::new(
            Arc::clone(source) as Arc<dyn SummarySource>,
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_first_turn_gets_summary() {
        let source = Arc::new(MockSource::new());
        source.push_envelope(ToolCallEnvelope::text("Farm X: 120 cows, 2 alerts"));
        let cache = cache_with(&source);

        let context = prepare_turn(&cache, 1).await;

        assert_eq!(context.farm_summary(), Some("Farm X: 120 cows, 2 alerts"));
    }

    #[tokio::test]
    async fn test_later_turns_skip_cache() {
        let source = Arc::new(MockSource::new());
        source.push_envelope(ToolCallEnvelope::text("unused"));
        let cache = cache_with(&source);

        let context = prepare_turn(&cache, 3).await;

        assert!(context.farm_summary().is_none());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_summary_leaves_context_empty() {
        let source = Arc::new(MockSource::new());
        source.push_failure("upstream unavailable");
        let cache = cache_with(&source);

        let context = prepare_turn(&cache, 1).await;

        assert!(!context.contains(FARM_SUMMARY_KEY));
        assert!(context.preloaded_summary_section().is_none());
    }

    #[test]
    fn test_preloaded_section_embeds_summary() {
        let context = RuntimeContext::new().with(FARM_SUMMARY_KEY, "Herd: 120 cows");

        let section = context.preloaded_summary_section().expect("section");
        assert!(section.starts_with("## Current Farm Status (Pre-loaded)\n"));
        assert!(section.contains("DO NOT call the farm summary tool again"));
        assert!(section.ends_with("Herd: 120 cows\n\n"));
    }

    #[test]
    fn test_non_string_summary_ignored() {
        let context = RuntimeContext::new().with(FARM_SUMMARY_KEY, 42);
        assert!(context.contains(FARM_SUMMARY_KEY));
        assert!(context.farm_summary().is_none());
    }
}
