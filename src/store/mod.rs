// Gateway module for store - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod file;
mod memory;
mod traits;

// Public re-exports - the ONLY way to access store functionality
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StoreStats};

#[cfg(test)]
pub use traits::MockKeyValueStore;

use std::sync::Arc;

use crate::app::{get_cache_dir, CacheBackend, CacheConfig};
use crate::utils::AssistantError;

/// Open the store selected by `cache.backend`
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>, AssistantError> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        CacheBackend::File => {
            let dir = get_cache_dir(config).map_err(|e| AssistantError::config(format!("{:#}", e)))?;
            Ok(Arc::new(FileStore::new(dir)?))
        }
    }
}
