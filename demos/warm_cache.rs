//! Warm the farm-summary cache and prepare a first conversation turn.
//!
//! # Running
//!
//! ```bash
//! FARM_MCP_URL=https://farm.example/mcp cargo run --example warm_cache
//! ```
//!
//! To see cache decisions:
//! ```bash
//! RUST_LOG=farm_context=debug FARM_MCP_URL=https://farm.example/mcp cargo run --example warm_cache
//! ```

use farm_context::{
    McpSummarySource, SummaryCache, SummaryConfig, SummarySource, Warmup, prepare_turn,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The crate logs through the `log` facade
    env_logger::init();

    let config = SummaryConfig::from_env()?;
    println!("Farm MCP server: {}", config.server_url);

    let source: Arc<dyn SummarySource> = Arc::new(McpSummarySource::from_config(&config)?);
    let cache = SummaryCache::anchored(&config, || source);

    let warmup = Warmup::new(Arc::clone(&cache));
    if config.warm_on_start && warmup.trigger() {
        println!("Warmup started");
    }

    // A client page load asking for a prefetch joins the same fetch
    let response = warmup.prefetch();
    println!("Prefetch: {}", serde_json::to_string(&response)?);

    // First message of a new conversation
    let context = prepare_turn(&cache, 1).await;
    match context.preloaded_summary_section() {
        Some(section) => println!("\n{section}"),
        None => println!("\nNo farm summary available; the agent will fetch on demand."),
    }

    // Second request within the TTL is served from memory
    let again = cache.get().await;
    println!("Cached: {}", again.is_some());

    Ok(())
}
