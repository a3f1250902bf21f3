use std::sync::Arc;
use tracing::debug;

use super::anthropic::AnthropicProvider;
use super::chain::ProviderChain;
use super::google::GoogleProvider;
use super::http::AdapterConfig;
use super::openai::OpenAiProvider;
use super::traits::Provider;
use crate::app::Config;
use crate::utils::AssistantError;

/// Builds the provider list from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider by name
    pub fn create(name: &str, config: AdapterConfig) -> Result<Arc<dyn Provider>, AssistantError> {
        let provider: Arc<dyn Provider> = match name {
            "openai" => Arc::new(OpenAiProvider::new(config)?),
            "anthropic" => Arc::new(AnthropicProvider::new(config)?),
            "google" => Arc::new(GoogleProvider::new(config)?),
            other => {
                return Err(AssistantError::invalid_config(
                    "providers",
                    format!("unknown provider '{}'", other),
                ))
            }
        };
        Ok(provider)
    }

    /// Every enabled provider in the configuration. Providers without a key
    /// are still included; the chain skips them as unavailable.
    pub fn from_config(config: &Config) -> Result<Vec<Arc<dyn Provider>>, AssistantError> {
        let mut providers = Vec::new();
        for (name, settings) in config.providers.iter() {
            if !settings.enabled {
                debug!(provider = name, "Provider disabled in configuration");
                continue;
            }
            providers.push(Self::create(name, AdapterConfig::from_settings(settings))?);
        }
        Ok(providers)
    }

    /// Convenience: the configured providers wrapped in a chain
    pub fn chain_from_config(config: &Config) -> Result<ProviderChain, AssistantError> {
        Ok(ProviderChain::new(Self::from_config(config)?))
    }
}
