//! Configuration source trait.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for configuration sources that can be polled.
///
/// A source keeps a local cache of the remote store. [`refresh`](ConfigSource::refresh) pulls
/// the latest snapshot into that cache and [`get`](ConfigSource::get) reads from it, so reads
/// never block on the network.
///
/// Implement this trait to watch a custom store (a database table, a service registry, ...).
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Value type stored under each key.
    ///
    /// Change detection compares values with `PartialEq`, so composite values must compare
    /// by content.
    type Value: Clone + PartialEq + Send + Sync + 'static;

    /// Read the cached value for `key`.
    ///
    /// Returns `None` when the key has neither an explicit value nor a default.
    fn get(&self, key: &str) -> Option<Self::Value>;

    /// Install a fallback value used by [`get`](ConfigSource::get) when `key` has no
    /// explicit value.
    fn set_default(&self, key: &str, value: Self::Value);

    /// Pull the latest snapshot from the backing store into the local cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or its payload cannot be decoded.
    /// The previously cached snapshot must stay readable in that case.
    async fn refresh(&self) -> Result<()>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}

#[async_trait]
impl<S> ConfigSource for Arc<S>
where
    S: ConfigSource + ?Sized,
{
    type Value = S::Value;

    fn get(&self, key: &str) -> Option<Self::Value> {
        (**self).get(key)
    }

    fn set_default(&self, key: &str, value: Self::Value) {
        (**self).set_default(key, value)
    }

    async fn refresh(&self) -> Result<()> {
        (**self).refresh().await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
