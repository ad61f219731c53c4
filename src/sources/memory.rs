//! In-process configuration source.

use super::ConfigSource;
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory configuration source.
///
/// Holds two layers: the local cache that [`get`](ConfigSource::get) reads, and a staging area
/// standing in for the remote store. Staged writes become visible only after a successful
/// [`refresh`](ConfigSource::refresh), which mirrors how a remote source behaves between polls.
/// Refresh failures can be injected to exercise outage handling.
///
/// # Examples
///
/// ```rust
/// use remote_config_watch::sources::{ConfigSource, MemorySource};
///
/// # tokio_test::block_on(async {
/// let source = MemorySource::new("local");
/// source.set("limit", 10);
///
/// source.stage("limit", 20);
/// assert_eq!(source.get("limit"), Some(10));
///
/// source.refresh().await.unwrap();
/// assert_eq!(source.get("limit"), Some(20));
/// # });
/// ```
pub struct MemorySource<V> {
    name: String,
    inner: RwLock<MemoryInner<V>>,
    refreshes: AtomicU64,
}

struct MemoryInner<V> {
    values: HashMap<String, V>,
    defaults: HashMap<String, V>,
    /// `None` stages a deletion.
    staged: Vec<(String, Option<V>)>,
    failures_pending: u32,
}

impl<V> MemorySource<V> {
    /// Create an empty in-memory source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(MemoryInner {
                values: HashMap::new(),
                defaults: HashMap::new(),
                staged: Vec::new(),
                failures_pending: 0,
            }),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Builder-style variant of [`set`](MemorySource::set).
    pub fn with_value(self, key: impl Into<String>, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Write a value straight into the local cache.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.inner.write().values.insert(key.into(), value);
    }

    /// Remove an explicit value from the local cache. Defaults are untouched.
    pub fn remove(&self, key: &str) {
        self.inner.write().values.remove(key);
    }

    /// Stage a remote-side write, applied by the next successful refresh.
    pub fn stage(&self, key: impl Into<String>, value: V) {
        self.inner.write().staged.push((key.into(), Some(value)));
    }

    /// Stage a remote-side deletion, applied by the next successful refresh.
    pub fn stage_remove(&self, key: impl Into<String>) {
        self.inner.write().staged.push((key.into(), None));
    }

    /// Make the next `count` refreshes fail without touching the cache.
    pub fn fail_next_refreshes(&self, count: u32) {
        self.inner.write().failures_pending = count;
    }

    /// Number of refresh attempts so far, failed ones included.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<V> ConfigSource for MemorySource<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = V;

    fn get(&self, key: &str) -> Option<V> {
        let inner = self.inner.read();
        inner
            .values
            .get(key)
            .or_else(|| inner.defaults.get(key))
            .cloned()
    }

    fn set_default(&self, key: &str, value: V) {
        self.inner.write().defaults.insert(key.to_string(), value);
    }

    async fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.write();
        if inner.failures_pending > 0 {
            inner.failures_pending -= 1;
            return Err(ConfigError::refresh(&self.name, "injected refresh failure"));
        }

        let staged = std::mem::take(&mut inner.staged);
        for (key, value) in staged {
            match value {
                Some(value) => {
                    inner.values.insert(key, value);
                }
                None => {
                    inner.values.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("memory:{}", self.name)
    }
}
