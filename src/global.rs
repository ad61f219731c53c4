//! Opt-in process-wide configuration handle.
//!
//! Prefer passing a [`RemoteConfig`] explicitly. This slot exists for processes that want a
//! single shared handle without threading it through every layer. It is initialized at most
//! once: later calls return the existing handle and never start a second poll loop.
//!
//! # Examples
//!
//! ```rust,no_run
//! use remote_config_watch::global;
//! use remote_config_watch::prelude::*;
//! use remote_config_watch::sources::FileSource;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let config = global::init(|| async {
//!     let source: global::SharedSource = Arc::new(FileSource::new("config/app.yaml"));
//!     RemoteConfig::builder(source).build().await
//! })
//! .await?;
//!
//! config.watch("limit", || println!("limit changed"));
//! # Ok(())
//! # }
//! ```

use crate::core::RemoteConfig;
use crate::error::Result;
use crate::sources::ConfigSource;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Type-erased JSON source held by the global handle.
pub type SharedSource = Arc<dyn ConfigSource<Value = JsonValue>>;

/// Handle type stored in the global slot.
pub type SharedConfig = RemoteConfig<SharedSource>;

static GLOBAL: OnceCell<SharedConfig> = OnceCell::const_new();

/// Initialize the global handle with `init`, or return the existing one.
///
/// `init` runs at most once per process, even under concurrent calls. If it fails, the slot
/// stays empty and a later call may try again.
///
/// # Errors
///
/// Returns the error produced by `init`.
pub async fn init<F, Fut>(init: F) -> Result<&'static SharedConfig>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<SharedConfig>>,
{
    GLOBAL.get_or_try_init(init).await
}

/// The global handle, if it has been initialized.
pub fn get() -> Option<&'static SharedConfig> {
    GLOBAL.get()
}
