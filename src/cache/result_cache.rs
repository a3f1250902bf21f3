use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::app::CacheConfig;
use crate::store::KeyValueStore;
use crate::utils::AssistantError;

/// JSON values over a [`KeyValueStore`] with a default TTL, namespaced by a
/// key prefix. Store failures are logged and reported as misses.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    enabled: bool,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str, enabled: bool, ttl: Duration) -> Self {
        Self {
            store,
            namespace: format!("{}:", namespace),
            enabled,
            ttl,
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, namespace: &str, config: &CacheConfig) -> Self {
        Self::new(store, namespace, config.enabled, Duration::from_secs(config.ttl))
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let key = self.full_key(key);
        let key = key.as_str();
        let bytes = match self.store.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, "Failed to read from cache: {}", e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key, "Result cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, "Discarding undecodable cache value: {}", e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.ttl)
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, "Failed to serialize cache value: {}", e);
                return false;
            }
        };
        match self.store.set(&self.full_key(key), bytes, ttl) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, "Failed to write to cache: {}", e);
                false
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        match self.store.delete(&self.full_key(key)) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(key, "Failed to delete from cache: {}", e);
                false
            }
        }
    }

    /// Remove this namespace's entries; stores that cannot enumerate are cleared wholesale
    pub fn clear(&self) -> Result<usize, AssistantError> {
        if !self.store.supports_scan() {
            self.store.clear()?;
            return Ok(0);
        }
        let mut removed = 0;
        for (key, _) in self.store.scan_prefix(&self.namespace)? {
            if self.store.delete(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockKeyValueStore};
    use std::collections::BTreeMap;

    fn cache() -> ResultCache {
        ResultCache::new(Arc::new(MemoryStore::new()), "result", true, Duration::from_secs(60))
    }

    #[test]
    fn test_json_round_trip() {
        let cache = cache();
        let mut value = BTreeMap::new();
        value.insert("files".to_string(), 3);
        assert!(cache.set("report", &value));
        assert_eq!(cache.get::<BTreeMap<String, i32>>("report"), Some(value));
        assert!(cache.delete("report"));
        assert_eq!(cache.get::<BTreeMap<String, i32>>("report"), None);
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = cache();
        cache.set("k", &"text");
        assert_eq!(cache.get::<u32>("k"), None);
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ResultCache::new(Arc::new(MemoryStore::new()), "result", false, Duration::from_secs(60));
        assert!(!cache.set("k", &1));
        assert_eq!(cache.get::<i32>("k"), None);
    }

    #[test]
    fn test_store_failures_degrade() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(AssistantError::Store("down".to_string())));
        store
            .expect_set()
            .returning(|_, _, _| Err(AssistantError::Store("down".to_string())));
        let cache = ResultCache::new(Arc::new(store), "result", true, Duration::from_secs(1));

        assert_eq!(cache.get::<i32>("k"), None);
        assert!(!cache.set("k", &1));
    }

    #[test]
    fn test_clear_is_namespaced() {
        let store = Arc::new(MemoryStore::new());
        let results = ResultCache::new(store.clone(), "result", true, Duration::from_secs(60));
        let others = ResultCache::new(store.clone(), "other", true, Duration::from_secs(60));
        results.set("a", &1);
        results.set("b", &2);
        others.set("a", &3);

        assert_eq!(results.clear().unwrap(), 2);
        assert_eq!(others.get::<i32>("a"), Some(3));
        assert_eq!(store.get("result:a").unwrap(), None);
    }
}
