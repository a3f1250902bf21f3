use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::{KeyValueStore, StoreStats};
use crate::utils::{sha256_hex, AssistantError};

/// On-disk record; the key is kept so scans can recover it from the hashed file name
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    /// Unix milliseconds, 0 = never
    expires_at_ms: i64,
    data: Vec<u8>,
}

impl StoredEntry {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms == 0 || now_ms < self.expires_at_ms
    }
}

/// Disk-backed store: one bincode + lz4 file per key, sharded by hash prefix
#[derive(Debug)]
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at `cache_dir`
    pub fn new(cache_dir: PathBuf) -> Result<Self, AssistantError> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Generate cache file path for a key
    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = sha256_hex(key);
        // Use first 2 chars of hash for directory sharding
        self.cache_dir.join(&hash[..2]).join(format!("{}.cache", hash))
    }

    fn shard_dirs(&self) -> Result<Vec<PathBuf>, AssistantError> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_shard = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.len() == 2 && n.chars().all(|c| c.is_ascii_hexdigit()));
            if is_shard && path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, AssistantError> {
        let mut files = Vec::new();
        for shard in self.shard_dirs()? {
            for entry in fs::read_dir(shard)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) == Some("cache") {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    /// Read entry files until `limit` keys under `prefix` are found
    fn scan(&self, prefix: &str, limit: usize) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        let now = now_ms();
        let mut matches = Vec::new();
        for path in self.entry_files()? {
            if matches.len() >= limit {
                break;
            }
            if let Some(entry) = self.read_entry(&path, now)? {
                if entry.key.starts_with(prefix) {
                    matches.push((entry.key, entry.data));
                }
            }
        }
        Ok(matches)
    }

    fn encode(entry: &StoredEntry) -> Result<Vec<u8>, AssistantError> {
        let serialized = bincode::serialize(entry)
            .map_err(|e| AssistantError::Store(format!("Failed to serialize entry: {}", e)))?;
        // prepend_size lets decode skip tracking the original length
        Ok(lz4::block::compress(&serialized, None, true)?)
    }

    fn decode(bytes: &[u8]) -> Result<StoredEntry, AssistantError> {
        let decompressed = lz4::block::decompress(bytes, None)?;
        bincode::deserialize(&decompressed)
            .map_err(|e| AssistantError::Store(format!("Corrupt cache entry: {}", e)))
    }

    /// Read an entry, deleting it if it is expired or unreadable
    fn read_entry(&self, path: &Path, now_ms: i64) -> Result<Option<StoredEntry>, AssistantError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match Self::decode(&bytes) {
            Ok(entry) if entry.is_live(now_ms) => Ok(Some(entry)),
            Ok(_) => {
                debug!(path = %path.display(), "Removing expired cache entry");
                let _ = fs::remove_file(path);
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), "Removing unreadable cache entry: {}", e);
                let _ = fs::remove_file(path);
                Ok(None)
            }
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AssistantError> {
        let entry = self.read_entry(&self.entry_path(key), now_ms())?;
        Ok(entry.filter(|e| e.key == key).map(|e| e.data))
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AssistantError> {
        let expires_at_ms = if ttl.is_zero() {
            0
        } else {
            now_ms() + ttl.as_millis() as i64
        };
        let encoded = Self::encode(&StoredEntry {
            key: key.to_string(),
            expires_at_ms,
            data: value,
        })?;

        let path = self.entry_path(key);
        let parent = path
            .parent()
            .ok_or_else(|| AssistantError::Store(format!("Invalid cache path {}", path.display())))?;
        fs::create_dir_all(parent)?;

        // write-then-rename so concurrent readers never see a partial file
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&encoded)?;
        temp.persist(&path).map_err(|e| AssistantError::Io(e.error))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, AssistantError> {
        let path = self.entry_path(key);
        let live = self.read_entry(&path, now_ms())?.is_some();
        if live {
            fs::remove_file(&path)?;
        }
        Ok(live)
    }

    fn clear(&self) -> Result<(), AssistantError> {
        for shard in self.shard_dirs()? {
            fs::remove_dir_all(shard)?;
        }
        Ok(())
    }

    fn supports_scan(&self) -> bool {
        true
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        let mut matches = self.scan(prefix, usize::MAX)?;
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches)
    }

    fn scan_prefix_limited(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, AssistantError> {
        self.scan(prefix, limit)
    }

    fn stats(&self) -> Result<StoreStats, AssistantError> {
        let mut entries = 0;
        let mut size_bytes = 0;
        for path in self.entry_files()? {
            entries += 1;
            size_bytes += fs::metadata(&path)?.len();
        }
        Ok(StoreStats {
            entries,
            size_bytes,
            location: Some(self.cache_dir.clone()),
        })
    }
}
