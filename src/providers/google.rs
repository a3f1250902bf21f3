use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{build_client, send_json, text_at, AdapterConfig, PathStep};
use super::traits::{Provider, RequestOptions};
use crate::app::is_api_key_configured;
use crate::constants::GOOGLE_API_URL;
use crate::utils::{AssistantError, ProviderError};

const NAME: &str = "google";

/// Google Generative Language (Gemini) backend
pub struct GoogleProvider {
    client: Client,
    config: AdapterConfig,
}

impl GoogleProvider {
    pub fn new(config: AdapterConfig) -> Result<Self, AssistantError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn url(&self, options: &RequestOptions) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint_or(GOOGLE_API_URL).trim_end_matches('/'),
            self.config.model(options)
        )
    }

    fn body(&self, prompt: &str, options: &RequestOptions) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "temperature": self.config.temperature(options),
                "maxOutputTokens": self.config.max_tokens(options),
            },
        })
    }
}

/// `candidates[0].content.parts[0].text`
pub(super) fn extract_text(response: &Value) -> Option<String> {
    text_at(
        response,
        &[
            PathStep::Key("candidates"),
            PathStep::Index(0),
            PathStep::Key("content"),
            PathStep::Key("parts"),
            PathStep::Index(0),
            PathStep::Key("text"),
        ],
    )
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn is_available(&self) -> bool {
        let key = &self.config.api_key;
        is_api_key_configured(key) && (key.starts_with("AI") || key.len() > 20)
    }

    async fn request(&self, prompt: &str, options: &RequestOptions) -> Result<String, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }

        debug!(provider = NAME, model = self.config.model(options), "Sending request");

        let request = self
            .client
            .post(self.url(options))
            .query(&[("key", self.config.api_key.as_str())])
            .timeout(self.config.timeout(options))
            .json(&self.body(prompt, options));

        let response = send_json(NAME, request, prompt.len()).await?;
        extract_text(&response).ok_or_else(|| {
            ProviderError::invalid_response(NAME, "missing candidates[0].content.parts[0].text")
        })
    }
}
