use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::traits::{KeyValueStore, StoreStats};
use crate::utils::AssistantError;

struct Slot {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process store; contents are lost on exit
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AssistantError> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(slot) if slot.is_live(now) => Ok(Some(slot.data.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AssistantError> {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries.lock().insert(
            key.to_string(),
            Slot {
                data: value,
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, AssistantError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .remove(key)
            .map_or(false, |slot| slot.is_live(now)))
    }

    fn clear(&self) -> Result<(), AssistantError> {
        self.entries.lock().clear();
        Ok(())
    }

    fn supports_scan(&self) -> bool {
        true
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut matches: Vec<(String, Vec<u8>)> = entries
            .iter()
            .filter(|(key, slot)| key.starts_with(prefix) && slot.is_live(now))
            .map(|(key, slot)| (key.clone(), slot.data.clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches)
    }

    fn scan_prefix_limited(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        let now = Instant::now();
        let entries = self.entries.lock();
        Ok(entries
            .iter()
            .filter(|(key, slot)| key.starts_with(prefix) && slot.is_live(now))
            .take(limit)
            .map(|(key, slot)| (key.clone(), slot.data.clone()))
            .collect())
    }

    fn stats(&self) -> Result<StoreStats, AssistantError> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let live = entries.values().filter(|slot| slot.is_live(now));
        let (count, bytes) = live.fold((0usize, 0u64), |(n, b), slot| {
            (n + 1, b + slot.data.len() as u64)
        });
        Ok(StoreStats {
            entries: count,
            size_bytes: bytes,
            location: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("a", b"one".to_vec(), Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"one".to_vec()));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let store = MemoryStore::new();
        store.set("short", vec![1], Duration::from_millis(1)).unwrap();
        store.set("forever", vec![2], Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(store.get("short").unwrap(), None);
        assert_eq!(store.get("forever").unwrap(), Some(vec![2]));
        assert_eq!(store.scan_prefix("").unwrap().len(), 1);
    }

    #[test]
    fn test_scan_prefix_and_stats() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set("analysis:security:1", vec![1, 2], ttl).unwrap();
        store.set("analysis:security:2", vec![3], ttl).unwrap();
        store.set("analysis:quality:1", vec![4], ttl).unwrap();

        let found = store.scan_prefix("analysis:security:").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "analysis:security:1");

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.size_bytes, 4);

        store.clear().unwrap();
        assert_eq!(store.stats().unwrap().entries, 0);
    }
}
