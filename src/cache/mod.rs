// Gateway module for cache - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod response_cache;
mod result_cache;
mod signature;

// Public re-exports - the ONLY way to access cache functionality
pub use response_cache::{CacheEntry, CacheMetrics, ResponseCache};
pub use result_cache::ResultCache;
pub use signature::{CodeSignature, SignatureMetrics};
