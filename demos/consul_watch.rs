//! Example watching a Consul KV document.
//!
//! Settings come from `RCW_*` environment variables when present, otherwise a local agent is
//! assumed:
//!
//! ```text
//! RCW_ADDRESS=127.0.0.1:8500 RCW_PATH=services/api/config RCW_WATCH_FREQUENCY_MS=2000 \
//!     cargo run --example consul_watch
//! ```
//!
//! Then change the document with `consul kv put services/api/config '{"limit": 20}'`.

use remote_config_watch::prelude::*;
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = WatchSettings::from_env("RCW").unwrap_or_else(|e| {
        println!("No RCW_* settings ({}), using a local agent", e);
        WatchSettings::new("127.0.0.1:8500", Duration::from_secs(2))
            .with_path("services/api/config")
    });

    println!("Watching {} every {:?}", settings.address, settings.watch_frequency);
    let config = RemoteConfig::connect(&settings).await?;

    println!("limit   = {}", config.get_or_default("limit", json!(100)));
    println!("timeout = {}", config.get_or_default("timeout", json!(30)));

    for key in ["limit", "timeout"] {
        let reader = config.clone();
        config.watch(key, move || {
            println!("{} changed to {}", key, reader.get(key).unwrap_or_default());
        });
    }

    println!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    config.shutdown().await?;
    Ok(())
}
