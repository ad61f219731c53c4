//! Last-known-good document cache shared by the JSON-backed sources.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Cached configuration document plus a table of default values.
///
/// The document is swapped atomically on each successful refresh, so readers always see a
/// complete snapshot. Keys are dotted paths into nested objects (`"db.pool.max"`); a root key
/// that literally contains dots is matched first.
///
/// Keys are case-insensitive: an exact match wins, otherwise any key equal ignoring ASCII case
/// is used. YAML and TOML documents arrive with lowercased keys, so `maxConn` still finds
/// `maxconn` there while JSON documents keep their original case.
///
/// `null` is treated as "not set", so a default shows through it.
pub struct DocumentCache {
    document: ArcSwap<JsonValue>,
    defaults: RwLock<HashMap<String, JsonValue>>,
}

impl DocumentCache {
    /// Create a cache holding an empty document.
    pub fn new() -> Self {
        Self {
            document: ArcSwap::from_pointee(JsonValue::Object(Map::new())),
            defaults: RwLock::new(HashMap::new()),
        }
    }

    /// Atomically replace the cached document.
    pub fn replace(&self, document: JsonValue) {
        self.document.store(Arc::new(document));
    }

    /// The currently cached document.
    pub fn document(&self) -> Arc<JsonValue> {
        self.document.load_full()
    }

    /// Resolve `key` against the document, falling back to the defaults table.
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        let document = self.document.load();
        if let Some(value) = lookup(&document, key) {
            return Some(value.clone());
        }
        self.defaults.read().get(&key.to_lowercase()).cloned()
    }

    /// Install a default for `key`.
    pub fn set_default(&self, key: &str, value: JsonValue) {
        self.defaults.write().insert(key.to_lowercase(), value);
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(document: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    let found = match child(document, key) {
        Some(value) => Some(value),
        None => key
            .split('.')
            .try_fold(document, |node, segment| child(node, segment)),
    };
    found.filter(|value| !value.is_null())
}

fn child<'a>(node: &'a JsonValue, segment: &str) -> Option<&'a JsonValue> {
    let object = node.as_object()?;
    object.get(segment).or_else(|| {
        object
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(segment))
            .map(|(_, value)| value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_lookup() {
        let cache = DocumentCache::new();
        cache.replace(json!({
            "db": { "pool": { "max": 16 } },
            "feature.flag": true
        }));

        assert_eq!(cache.get("db.pool.max"), Some(json!(16)));
        assert_eq!(cache.get("db.pool"), Some(json!({ "max": 16 })));
        assert_eq!(cache.get("feature.flag"), Some(json!(true)));
        assert_eq!(cache.get("db.missing"), None);
        assert_eq!(cache.get("db.pool.max.deeper"), None);
    }

    #[test]
    fn test_defaults_fill_gaps_only() {
        let cache = DocumentCache::new();
        cache.replace(json!({ "limit": 10, "empty": null }));
        cache.set_default("limit", json!(99));
        cache.set_default("timeout", json!(30));
        cache.set_default("empty", json!("fallback"));

        assert_eq!(cache.get("limit"), Some(json!(10)));
        assert_eq!(cache.get("timeout"), Some(json!(30)));
        assert_eq!(cache.get("empty"), Some(json!("fallback")));
    }

    #[test]
    fn test_lookup_ignores_case() {
        let cache = DocumentCache::new();
        cache.replace(json!({
            "maxConn": 5,
            "maxconn": 6,
            "DB": { "Host": "x" },
            "pool": { "size": 3 }
        }));

        assert_eq!(cache.get("maxConn"), Some(json!(5)));
        assert_eq!(cache.get("maxconn"), Some(json!(6)));
        assert_eq!(cache.get("DB.Host"), Some(json!("x")));
        assert_eq!(cache.get("db.host"), Some(json!("x")));
        assert_eq!(cache.get("Pool.Size"), Some(json!(3)));

        cache.set_default("Timeout", json!(30));
        assert_eq!(cache.get("timeout"), Some(json!(30)));
        assert_eq!(cache.get("TIMEOUT"), Some(json!(30)));
    }

    #[test]
    fn test_replace_swaps_whole_document() {
        let cache = DocumentCache::new();
        cache.replace(json!({ "a": 1, "b": 2 }));
        cache.replace(json!({ "a": 3 }));

        assert_eq!(cache.get("a"), Some(json!(3)));
        assert_eq!(cache.get("b"), None);
        assert_eq!(*cache.document(), json!({ "a": 3 }));
    }
}
