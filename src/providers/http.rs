use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::error;

use super::traits::RequestOptions;
use crate::app::ProviderSettings;
use crate::utils::{AssistantError, ProviderError};

/// Settings shared by every HTTP-backed provider, with the API key already resolved
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub priority: i32,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl AdapterConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            api_key: settings.resolve_api_key().unwrap_or_default(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            priority: settings.priority,
            endpoint: settings.endpoint.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    pub(super) fn model<'a>(&'a self, options: &'a RequestOptions) -> &'a str {
        options.model.as_deref().unwrap_or(&self.model)
    }

    pub(super) fn max_tokens(&self, options: &RequestOptions) -> usize {
        options.max_tokens.unwrap_or(self.max_tokens)
    }

    pub(super) fn temperature(&self, options: &RequestOptions) -> f32 {
        options.temperature.unwrap_or(self.temperature)
    }

    pub(super) fn timeout(&self, options: &RequestOptions) -> Duration {
        options.timeout.unwrap_or(self.timeout)
    }

    pub(super) fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint.as_deref().unwrap_or(default)
    }
}

pub(super) fn build_client() -> Result<Client, AssistantError> {
    Client::builder()
        .build()
        .map_err(|e| AssistantError::config(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and decode the JSON body, classifying every failure
pub(super) async fn send_json(
    provider: &str,
    request: RequestBuilder,
    prompt_length: usize,
) -> Result<Value, ProviderError> {
    let result = send_inner(provider, request).await;
    if let Err(err) = &result {
        error!(
            provider,
            prompt_length,
            status = err.status_code(),
            "API request failed: {}",
            err
        );
    }
    result
}

async fn send_inner(provider: &str, request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::timeout(provider)
        } else {
            ProviderError::network(provider, e)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(
            provider,
            status.as_u16(),
            retry_after,
            &body,
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::invalid_response(provider, e))
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored
pub(super) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Follow a path of object keys and array indexes to a string leaf
pub(super) fn text_at(value: &Value, path: &[PathStep]) -> Option<String> {
    let mut current = value;
    for step in path {
        current = match step {
            PathStep::Key(key) => current.get(*key)?,
            PathStep::Index(index) => current.get(*index)?,
        };
    }
    current.as_str().map(str::to_string)
}

pub(super) enum PathStep {
    Key(&'static str),
    Index(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(30)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_text_at() {
        let value = json!({"a": [{"b": "found"}]});
        let path = [PathStep::Key("a"), PathStep::Index(0), PathStep::Key("b")];
        assert_eq!(text_at(&value, &path).as_deref(), Some("found"));

        let missing = [PathStep::Key("a"), PathStep::Index(3)];
        assert_eq!(text_at(&value, &missing), None);
    }

    #[test]
    fn test_options_override_config() {
        let config = AdapterConfig::from_settings(&ProviderSettings::openai());
        let options = RequestOptions {
            model: Some("gpt-4o".to_string()),
            max_tokens: Some(100),
            ..Default::default()
        };
        assert_eq!(config.model(&options), "gpt-4o");
        assert_eq!(config.max_tokens(&options), 100);
        assert_eq!(config.temperature(&options), config.temperature);
        assert_eq!(config.timeout(&options), config.timeout);
    }
}
