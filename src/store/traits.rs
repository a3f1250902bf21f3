use std::path::PathBuf;
use std::time::Duration;

use crate::utils::AssistantError;

/// Size information reported by a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: usize,
    pub size_bytes: u64,
    pub location: Option<PathBuf>,
}

/// Generic key/value backend shared by the caches and the rate limiter.
///
/// Each call is atomic on its own; there are no multi-operation transactions.
/// A zero TTL stores the value without expiry.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AssistantError>;

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AssistantError>;

    /// Returns whether a live entry was removed
    fn delete(&self, key: &str) -> Result<bool, AssistantError>;

    fn clear(&self) -> Result<(), AssistantError>;

    /// Whether `scan_prefix` can enumerate keys
    fn supports_scan(&self) -> bool {
        false
    }

    /// Every live entry whose key starts with `prefix`. Backends that cannot
    /// enumerate return an empty list.
    fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        Ok(Vec::new())
    }

    /// At most `limit` entries under `prefix`; which ones is unspecified
    fn scan_prefix_limited(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        let mut matches = self.scan_prefix(prefix)?;
        matches.truncate(limit);
        Ok(matches)
    }

    fn stats(&self) -> Result<StoreStats, AssistantError> {
        Ok(StoreStats::default())
    }
}
