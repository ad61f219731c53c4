//! Table of watched keys.

use crate::core::handler::SharedHandler;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// One registered watch, as captured by [`SubscriptionRegistry::snapshot`].
#[derive(Clone)]
pub struct WatchedEntry<V> {
    /// Watched key.
    pub key: String,
    /// Value observed at registration or at the last delivered change.
    pub last_value: Option<V>,
    /// Callback to fire on change.
    pub handler: SharedHandler,
    /// Registration generation; a re-`watch` of the same key gets a new one.
    pub generation: u64,
}

struct Subscription<V> {
    last_value: Option<V>,
    handler: SharedHandler,
    generation: u64,
}

struct RegistryInner<V> {
    entries: BTreeMap<String, Subscription<V>>,
    next_generation: u64,
}

/// Registry mapping each watched key to its last observed value and its callback.
///
/// Value and callback live in one entry, so they are always inserted and removed together.
/// Every operation takes the same lock for a short, non-blocking critical section. Callbacks
/// are never run under it: the poll cycle iterates over a [`snapshot`](Self::snapshot).
pub struct SubscriptionRegistry<V> {
    inner: Mutex<RegistryInner<V>>,
}

impl<V: Clone> SubscriptionRegistry<V> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                entries: BTreeMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Register `key`, replacing any existing entry (value and callback alike).
    ///
    /// Returns the generation assigned to the new entry.
    pub fn insert(&self, key: impl Into<String>, initial: Option<V>, handler: SharedHandler) -> u64 {
        let mut inner = self.inner.lock();
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.entries.insert(
            key.into(),
            Subscription {
                last_value: initial,
                handler,
                generation,
            },
        );
        generation
    }

    /// Remove `key`. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Copy every entry, ordered by key.
    pub fn snapshot(&self) -> Vec<WatchedEntry<V>> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .map(|(key, sub)| WatchedEntry {
                key: key.clone(),
                last_value: sub.last_value.clone(),
                handler: sub.handler.clone(),
                generation: sub.generation,
            })
            .collect()
    }

    /// Store `value` as the last observed value of `key`.
    ///
    /// Applied only if the entry still exists with the given `generation`. An entry that was
    /// removed, or replaced by a newer `watch`, is left alone and `false` is returned.
    pub fn update_value(&self, key: &str, generation: u64, value: Option<V>) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.get_mut(key) {
            Some(sub) if sub.generation == generation => {
                sub.last_value = value;
                true
            }
            _ => false,
        }
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Last observed value of `key`, if registered.
    pub fn last_value(&self, key: &str) -> Option<Option<V>> {
        self.inner
            .lock()
            .entries
            .get(key)
            .map(|sub| sub.last_value.clone())
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for SubscriptionRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: &Arc<AtomicUsize>) -> SharedHandler {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_insert_and_snapshot() {
        let registry = SubscriptionRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.insert("b", Some(2), counting_handler(&counter));
        registry.insert("a", Some(1), counting_handler(&counter));

        let snapshot = registry.snapshot();
        let keys: Vec<_> = snapshot.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(snapshot[0].last_value, Some(1));

        for entry in &snapshot {
            entry.handler.on_change();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reinsert_replaces_entry() {
        let registry = SubscriptionRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let gen1 = registry.insert("k", Some(1), counting_handler(&first));
        let gen2 = registry.insert("k", Some(5), counting_handler(&second));
        assert_ne!(gen1, gen2);
        assert_eq!(registry.len(), 1);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].last_value, Some(5));
        snapshot[0].handler.on_change();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        registry.insert("k", Some(1), Arc::new(|| {}));

        assert!(registry.remove("k"));
        assert!(!registry.remove("k"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_after_remove_does_not_resurrect() {
        let registry = SubscriptionRegistry::new();
        let generation = registry.insert("k", Some(1), Arc::new(|| {}));
        registry.remove("k");

        assert!(!registry.update_value("k", generation, Some(2)));
        assert!(!registry.contains("k"));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let registry = SubscriptionRegistry::new();
        let old = registry.insert("k", Some(1), Arc::new(|| {}));
        let new = registry.insert("k", Some(7), Arc::new(|| {}));

        assert!(!registry.update_value("k", old, Some(2)));
        assert_eq!(registry.last_value("k"), Some(Some(7)));

        assert!(registry.update_value("k", new, Some(8)));
        assert_eq!(registry.last_value("k"), Some(Some(8)));
    }

    #[test]
    fn test_absent_value_is_tracked() {
        let registry: SubscriptionRegistry<i32> = SubscriptionRegistry::new();
        let generation = registry.insert("k", None, Arc::new(|| {}));
        assert_eq!(registry.last_value("k"), Some(None));

        assert!(registry.update_value("k", generation, Some(3)));
        assert_eq!(registry.keys(), vec!["k".to_string()]);
        assert_eq!(registry.last_value("missing"), None);
    }
}
