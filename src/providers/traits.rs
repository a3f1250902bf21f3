use async_trait::async_trait;
use std::time::Duration;

use crate::utils::ProviderError;

/// Per-request overrides; `None` falls back to the provider's configured value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub model: Option<String>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Core trait that every remote completion backend implements
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier ("openai", "anthropic", ...)
    fn name(&self) -> &str;

    /// Higher values are tried first by the chain
    fn priority(&self) -> i32;

    /// Cheap local check (credentials present and well-formed); never hits the network
    fn is_available(&self) -> bool;

    /// Send a single-turn prompt and return the completion text
    async fn request(&self, prompt: &str, options: &RequestOptions) -> Result<String, ProviderError>;
}
