// Gateway module for app - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod config;

// Public re-exports - the ONLY way to access app functionality
pub use config::{
    get_cache_dir, get_config_dir, init_config, is_api_key_configured, load_config, save_config,
    validate_configuration, AnalysisConfig, CacheBackend, CacheConfig, Config, ConfigValidation,
    ProviderInstructions, ProviderSettings, ProvidersConfig, RateLimitConfig,
    PROVIDER_INSTRUCTIONS,
};
