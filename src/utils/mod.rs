// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod hashing;
mod logger;

// Public re-exports - the ONLY way to access utils functionality
pub use errors::{AssistantError, ErrorKind, ProviderError, ProviderErrorKind};
pub use hashing::{code_fingerprint, normalize_code, sha256_hex};
pub use logger::{init_logger, preview};
