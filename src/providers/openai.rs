use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{build_client, send_json, text_at, AdapterConfig, PathStep};
use super::traits::{Provider, RequestOptions};
use crate::app::is_api_key_configured;
use crate::constants::OPENAI_API_URL;
use crate::utils::{AssistantError, ProviderError};

const NAME: &str = "openai";

/// OpenAI chat completions backend
pub struct OpenAiProvider {
    client: Client,
    config: AdapterConfig,
}

impl OpenAiProvider {
    pub fn new(config: AdapterConfig) -> Result<Self, AssistantError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn body(&self, prompt: &str, options: &RequestOptions) -> Value {
        json!({
            "model": self.config.model(options),
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "max_tokens": self.config.max_tokens(options),
            "temperature": self.config.temperature(options),
        })
    }
}

/// `choices[0].message.content`
pub(super) fn extract_text(response: &Value) -> Option<String> {
    text_at(
        response,
        &[
            PathStep::Key("choices"),
            PathStep::Index(0),
            PathStep::Key("message"),
            PathStep::Key("content"),
        ],
    )
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn is_available(&self) -> bool {
        is_api_key_configured(&self.config.api_key) && self.config.api_key.starts_with("sk-")
    }

    async fn request(&self, prompt: &str, options: &RequestOptions) -> Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }

        debug!(provider = NAME, model = self.config.model(options), "Sending request");

        let request = self
            .client
            .post(self.config.endpoint_or(OPENAI_API_URL))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout(options))
            .json(&self.body(prompt, options));

        let response = send_json(NAME, request, prompt.len()).await?;
        extract_text(&response)
            .ok_or_else(|| ProviderError::invalid_response(NAME, "missing choices[0].message.content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ProviderSettings;

    fn provider(api_key: &str) -> OpenAiProvider {
        let mut config = AdapterConfig::from_settings(&ProviderSettings::openai());
        config.api_key = api_key.to_string();
        OpenAiProvider::new(config).unwrap()
    }

    #[test]
    fn test_availability_requires_sk_prefix() {
        assert!(provider("sk-live-123").is_available());
        assert!(!provider("").is_available());
        assert!(!provider("your_openai_api_key_here").is_available());
        assert!(!provider("abc123").is_available());
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"issues\": []}" } }]
        });
        assert_eq!(extract_text(&response).as_deref(), Some("{\"issues\": []}"));
        assert_eq!(extract_text(&json!({ "choices": [] })), None);
    }

    #[test]
    fn test_body_uses_option_overrides() {
        let provider = provider("sk-test");
        let body = provider.body("hello", &RequestOptions::default().with_max_tokens(10));
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_not_called() {
        let err = provider("").request("hi", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, crate::utils::ProviderErrorKind::Unavailable);
    }
}
