use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{build_client, send_json, text_at, AdapterConfig, PathStep};
use super::traits::{Provider, RequestOptions};
use crate::app::is_api_key_configured;
use crate::constants::{ANTHROPIC_API_URL, ANTHROPIC_API_VERSION};
use crate::utils::{AssistantError, ProviderError};

const NAME: &str = "anthropic";

/// Anthropic messages API backend
pub struct AnthropicProvider {
    client: Client,
    config: AdapterConfig,
}

impl AnthropicProvider {
    pub fn new(config: AdapterConfig) -> Result<Self, AssistantError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn body(&self, prompt: &str, options: &RequestOptions) -> Value {
        json!({
            "model": self.config.model(options),
            "max_tokens": self.config.max_tokens(options),
            "messages": [
                { "role": "user", "content": prompt }
            ],
        })
    }
}

/// `content[0].text`
pub(super) fn extract_text(response: &Value) -> Option<String> {
    text_at(
        response,
        &[PathStep::Key("content"), PathStep::Index(0), PathStep::Key("text")],
    )
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn is_available(&self) -> bool {
        is_api_key_configured(&self.config.api_key) && self.config.api_key.starts_with("sk-ant-")
    }

    async fn request(&self, prompt: &str, options: &RequestOptions) -> Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }

        debug!(provider = NAME, model = self.config.model(options), "Sending request");

        let request = self
            .client
            .post(self.config.endpoint_or(ANTHROPIC_API_URL))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .timeout(self.config.timeout(options))
            .json(&self.body(prompt, options));

        let response = send_json(NAME, request, prompt.len()).await?;
        extract_text(&response)
            .ok_or_else(|| ProviderError::invalid_response(NAME, "missing content[0].text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ProviderSettings;

    fn provider(api_key: &str) -> AnthropicProvider {
        let mut config = AdapterConfig::from_settings(&ProviderSettings::anthropic());
        config.api_key = api_key.to_string();
        AnthropicProvider::new(config).unwrap()
    }

    #[test]
    fn test_availability_requires_sk_ant_prefix() {
        assert!(provider("sk-ant-api03-xyz").is_available());
        assert!(!provider("sk-openai-style").is_available());
        assert!(!provider("your_anthropic_api_key_here").is_available());
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "content": [{ "type": "text", "text": "analysis" }],
            "stop_reason": "end_turn"
        });
        assert_eq!(extract_text(&response).as_deref(), Some("analysis"));
        assert_eq!(extract_text(&json!({ "content": [{ "type": "tool_use" }] })), None);
    }

    #[test]
    fn test_body_shape() {
        let body = provider("sk-ant-x").body("prompt", &RequestOptions::default());
        assert_eq!(body["model"], "claude-3-sonnet-20240229");
        assert_eq!(body["max_tokens"], 4000);
        assert!(body.get("temperature").is_none());
    }
}
