//! Built-in metrics for the poll loop.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Poll cycles and their duration
//! - Refresh failures
//! - Detected changes
//! - Callback panics
//! - Watched keys
//!
//! # Examples
//!
//! ```rust,no_run
//! use remote_config_watch::prelude::*;
//! use remote_config_watch::sources::MemorySource;
//! use opentelemetry::global;
//!
//! # async fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//! let source = MemorySource::<i64>::new("local");
//!
//! let config = RemoteConfig::builder(source)
//!     .with_metrics(meter)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod watch_metrics;

pub use watch_metrics::WatchMetrics;
