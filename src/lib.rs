//! # remote-config-watch
//!
//! Poll a remote key/value configuration store and fire callbacks when watched keys change.
//!
//! ## Overview
//!
//! `remote-config-watch` keeps a local cache of a remote configuration document (Consul KV,
//! an HTTP endpoint, a file, or any custom [`ConfigSource`](sources::ConfigSource)) and
//! refreshes it on a fixed interval. Callers register callbacks for the keys they care about;
//! after each refresh every watched key is compared with the value last seen, and callbacks
//! fire for the ones that changed.
//!
//! - Reads never block on the network: they hit the cache
//! - A failed refresh keeps the last-good snapshot, so outages only cause staleness
//! - One callback per value transition, no false positives
//! - Callbacks run outside the registry lock and a panicking one is isolated
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_config_watch::prelude::*;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> remote_config_watch::error::Result<()> {
//! let settings = WatchSettings::new("127.0.0.1:8500", Duration::from_secs(10))
//!     .with_path("services/api/config");
//! let config = RemoteConfig::connect(&settings).await?;
//!
//! let timeout = config.get_or_default("timeout", json!(30));
//! println!("timeout: {}", timeout);
//!
//! config.watch("limit", || println!("limit changed"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `remote` (default): [`RemoteSource`](sources::RemoteSource) for Consul and HTTP stores
//! - `validation` (default): the [`Validate`](core::Validate) trait and settings checks in
//!   `RemoteConfig::connect`
//! - `metrics`: OpenTelemetry metrics for the poll loop

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod global;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ChangeHandler, PollReport, PollState, RemoteConfig, RemoteConfigBuilder, WatchSettings,
    };
    pub use crate::error::{ConfigError, Result, ValidationError};
    pub use crate::sources::ConfigSource;

    #[cfg(feature = "validation")]
    pub use crate::core::Validate;
}
