use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::signature::CodeSignature;
use crate::analyzers::AnalyzerResult;
use crate::app::CacheConfig;
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_SEMANTIC_THRESHOLD, SIMILARITY_SCAN_LIMIT};
use crate::store::KeyValueStore;
use crate::utils::{code_fingerprint, AssistantError};

const KEY_PREFIX: &str = "analysis:";

/// What is persisted per (analyzer, code) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: AnalyzerResult,
    pub stored_at: DateTime<Utc>,
    pub code_hash: String,
    pub signature: CodeSignature,
    pub analyzer: String,
}

/// Counters since process start
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub semantic_hits: u64,
    pub total_requests: u64,
    /// Percentage of lookups answered by either path, two decimals
    pub hit_rate: f64,
}

/// Per-analyzer response cache with a near-duplicate fallback
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    enabled: bool,
    ttl: Duration,
    semantic_threshold: f64,
    /// Candidates compared per similarity lookup
    scan_limit: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    semantic_hits: AtomicU64,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            enabled: true,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            scan_limit: SIMILARITY_SCAN_LIMIT,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            semantic_hits: AtomicU64::new(0),
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::new(store)
            .with_enabled(config.enabled)
            .with_ttl(Duration::from_secs(config.ttl))
            .with_semantic_threshold(config.semantic_threshold)
            .with_scan_limit(config.similarity_scan_limit)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f64) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    pub fn with_scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = limit;
        self
    }

    /// `analysis:{analyzer}:{fingerprint}`
    pub fn key(code: &str, analyzer: &str) -> String {
        format!("{}{}:{}", KEY_PREFIX, analyzer, code_fingerprint(code))
    }

    /// Exact lookup, then a similarity scan over the analyzer's other entries
    pub fn lookup(&self, code: &str, analyzer: &str) -> Option<AnalyzerResult> {
        if !self.enabled {
            return None;
        }

        let key = Self::key(code, analyzer);
        if let Some(entry) = self.read_entry(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(analyzer, key = %key, "Cache hit");
            return Some(entry.result);
        }

        if let Some((result, similarity)) = self.find_similar(code, analyzer) {
            self.semantic_hits.fetch_add(1, Ordering::Relaxed);
            debug!(analyzer, similarity, "Semantic cache hit");
            self.store(code, analyzer, &result);
            return Some(result);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn store(&self, code: &str, analyzer: &str, result: &AnalyzerResult) {
        if !self.enabled {
            return;
        }

        let key = Self::key(code, analyzer);
        let entry = CacheEntry {
            result: result.clone(),
            stored_at: Utc::now(),
            code_hash: code_fingerprint(code),
            signature: CodeSignature::extract(code),
            analyzer: analyzer.to_string(),
        };

        let written = serde_json::to_vec(&entry)
            .map_err(AssistantError::from)
            .and_then(|bytes| self.store.set(&key, bytes, self.ttl));
        match written {
            Ok(()) => debug!(analyzer, key = %key, "Cached analysis result"),
            Err(e) => warn!(analyzer, "Failed to cache analysis result: {}", e),
        }
    }

    /// Remove every analysis entry; stores that cannot enumerate are cleared wholesale
    pub fn clear(&self) -> Result<usize, AssistantError> {
        if !self.store.supports_scan() {
            self.store.clear()?;
            return Ok(0);
        }
        let mut removed = 0;
        for (key, _) in self.store.scan_prefix(KEY_PREFIX)? {
            if self.store.delete(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let semantic_hits = self.semantic_hits.load(Ordering::Relaxed);
        let total_requests = hits + misses + semantic_hits;
        let hit_rate = if total_requests > 0 {
            let rate = (hits + semantic_hits) as f64 / total_requests as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        CacheMetrics {
            enabled: self.enabled,
            hits,
            misses,
            semantic_hits,
            total_requests,
            hit_rate,
        }
    }

    fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store.get(key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!(key, "Cache read failed, treating as miss: {}", e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, "Ignoring undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Best entry at or above the threshold among at most `scan_limit`
    /// candidates. Always `None` when the store cannot scan.
    fn find_similar(&self, code: &str, analyzer: &str) -> Option<(AnalyzerResult, f64)> {
        if !self.store.supports_scan() || self.scan_limit == 0 {
            return None;
        }

        let prefix = format!("{}{}:", KEY_PREFIX, analyzer);
        let candidates = match self.store.scan_prefix_limited(&prefix, self.scan_limit) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(analyzer, "Cache scan failed: {}", e);
                return None;
            }
        };

        let signature = CodeSignature::extract(code);
        candidates
            .into_iter()
            .take(self.scan_limit)
            .filter_map(|(_, bytes)| serde_json::from_slice::<CacheEntry>(&bytes).ok())
            .map(|entry| {
                let similarity = signature.similarity(&entry.signature);
                (entry.result, similarity)
            })
            .filter(|(_, similarity)| *similarity >= self.semantic_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{Issue, Severity};
    use crate::store::{MemoryStore, MockKeyValueStore};
    use pretty_assertions::assert_eq;

    fn sample_result() -> AnalyzerResult {
        let mut result = AnalyzerResult::new("security");
        result.issues.push(Issue {
            line: Some(4),
            issue_type: "sql_injection".to_string(),
            severity: Severity::Critical,
            message: "Query built from input".to_string(),
            suggestion: "Use prepared statements".to_string(),
            analyzer: None,
        });
        result.security_score = Some(2);
        result.summary = "Unsafe".to_string();
        result
    }

    fn memory_cache() -> ResponseCache {
        ResponseCache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_store_then_lookup_round_trips() {
        let cache = memory_cache();
        let code = "<?php $db->query($_GET['id']);";
        cache.store(code, "security", &sample_result());

        assert_eq!(cache.lookup(code, "security"), Some(sample_result()));
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_formatting_changes_hit_exactly() {
        let cache = memory_cache();
        cache.store("function a() { return 1; }", "quality", &sample_result());
        assert!(cache
            .lookup("function a() {\n  // one\n  return 1;\n}", "quality")
            .is_some());
        assert_eq!(cache.metrics().hits, 1);
        assert_eq!(cache.metrics().semantic_hits, 0);
    }

    #[test]
    fn test_similar_code_is_a_semantic_hit() {
        let cache = memory_cache();
        let original = "function calc($a, $b) { return $a + $b; }";
        let similar = "function calc($a, $b) {\n    return $a + $b + 0;\n}";
        cache.store(original, "quality", &sample_result());

        assert_eq!(cache.lookup(similar, "quality"), Some(sample_result()));
        let metrics = cache.metrics();
        assert_eq!(metrics.semantic_hits, 1);
        assert_eq!(metrics.misses, 0);

        // promoted to an exact entry
        cache.lookup(similar, "quality");
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_similarity_is_scoped_per_analyzer() {
        let cache = memory_cache();
        cache.store("function calc($a) { return $a; }", "quality", &sample_result());
        assert!(cache.lookup("function calc($a) { return $a * 1; }", "security").is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn test_unrelated_code_misses() {
        let cache = memory_cache();
        cache.store("class Foo { function bar($x) {} }", "quality", &sample_result());
        assert!(cache.lookup("function baz($y, $z) { return $y; }", "quality").is_none());
        assert_eq!(cache.metrics().misses, 1);
        assert_eq!(cache.metrics().hit_rate, 0.0);
    }

    #[test]
    fn test_disabled_cache_never_reads_or_writes() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().never();
        store.expect_set().never();
        let cache = ResponseCache::new(Arc::new(store)).with_enabled(false);

        cache.store("code", "security", &sample_result());
        assert!(cache.lookup("code", "security").is_none());
        assert!(!cache.metrics().enabled);
    }

    #[test]
    fn test_non_scanning_store_only_hits_exactly() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_supports_scan().return_const(false);
        store.expect_scan_prefix().never();
        let cache = ResponseCache::new(Arc::new(store));

        assert!(cache.lookup("function a($x) {}", "quality").is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn test_similarity_scan_is_bounded() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store.expect_supports_scan().return_const(true);
        store.expect_scan_prefix().never();
        store
            .expect_scan_prefix_limited()
            .withf(|prefix, limit| prefix.to_string() == "analysis:quality:" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        let cache = ResponseCache::new(Arc::new(store)).with_scan_limit(10);

        assert!(cache.lookup("function a($x) {}", "quality").is_none());
        assert_eq!(cache.metrics().misses, 1);
    }

    #[test]
    fn test_similarity_compares_at_most_the_limit() {
        let store = Arc::new(MemoryStore::new());
        let filler = ResponseCache::new(store.clone());
        for i in 0..30 {
            filler.store(&format!("class Unrelated{} {{}}", i), "quality", &sample_result());
        }
        assert_eq!(store.scan_prefix_limited("analysis:quality:", 5).unwrap().len(), 5);

        let cache = ResponseCache::new(store).with_scan_limit(0);
        cache.store("function calc($a) { return $a; }", "quality", &sample_result());
        // a zero limit disables the similarity path
        assert!(cache.lookup("function calc($a) { return $a * 1; }", "quality").is_none());
        assert_eq!(cache.metrics().semantic_hits, 0);
    }

    #[test]
    fn test_store_errors_are_misses() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(AssistantError::Store("offline".to_string())));
        store.expect_supports_scan().return_const(false);
        let cache = ResponseCache::new(Arc::new(store));

        assert!(cache.lookup("x", "security").is_none());
    }

    #[test]
    fn test_hit_rate_counts_both_paths() {
        let cache = memory_cache();
        cache.store("function f($a) { return $a; }", "quality", &sample_result());
        cache.lookup("function f($a) { return $a; }", "quality");
        cache.lookup("class Other {}", "quality");
        let metrics = cache.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.hit_rate, 50.0);
    }

    #[test]
    fn test_clear_only_removes_analysis_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("rate_limit:abc:0", b"1".to_vec(), Duration::from_secs(60))
            .unwrap();
        let cache = ResponseCache::new(store.clone());
        cache.store("a", "security", &sample_result());
        cache.store("b", "quality", &sample_result());

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(store.get("rate_limit:abc:0").unwrap().is_some());
    }
}
