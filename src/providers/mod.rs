// Gateway module for providers - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod anthropic;
mod chain;
mod factory;
mod google;
mod http;
mod openai;
mod traits;

// Public re-exports - the ONLY way to access provider functionality
pub use anthropic::AnthropicProvider;
pub use chain::{ChainResponse, ProviderChain};
pub use factory::ProviderFactory;
pub use google::GoogleProvider;
pub use http::AdapterConfig;
pub use openai::OpenAiProvider;
pub use traits::{Provider, RequestOptions};
