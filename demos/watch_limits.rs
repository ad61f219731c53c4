//! Example demonstrating key watches over an in-memory store.
//!
//! This example shows how to:
//! - Read values and install defaults
//! - Watch keys and react to changes
//! - Survive a store outage without losing updates
//! - Shut the poll loop down
//!
//! Run with: cargo run --example watch_limits

use remote_config_watch::prelude::*;
use remote_config_watch::sources::MemorySource;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("remote_config_watch=debug")),
        )
        .init();

    println!("=== Watch Limits Example ===\n");

    // The memory source stands in for a remote store; staged values appear on the next refresh.
    let store = Arc::new(MemorySource::new("limits").with_value("limit", json!(10)));
    let config = RemoteConfig::builder(Arc::clone(&store))
        .with_watch_frequency(Duration::from_millis(200))
        .build()
        .await?;

    println!("limit   = {}", config.get("limit").unwrap_or_default());
    println!("timeout = {}", config.get_or_default("timeout", json!(30)));
    println!();

    let reader = config.clone();
    config.watch("limit", move || {
        println!("-> limit changed to {}", reader.get("limit").unwrap_or_default());
    });

    println!("--- Updating limit to 20 ---");
    store.stage("limit", json!(20));
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("--- Store outage for two cycles, limit updated to 30 meanwhile ---");
    store.stage("limit", json!(30));
    store.fail_next_refreshes(2);
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("limit during outage = {}", config.get("limit").unwrap_or_default());
    tokio::time::sleep(Duration::from_millis(400)).await;

    println!("--- Unwatching limit ---");
    config.unwatch("limit");
    store.stage("limit", json!(40));
    tokio::time::sleep(Duration::from_millis(300)).await;
    println!("limit = {} (no callback)", config.get("limit").unwrap_or_default());

    config.shutdown().await?;
    println!("\npoll cycles run: {}", config.cycles());
    Ok(())
}
