use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_TOKENS, HTTP_REQUEST_TIMEOUT_SECS};
use crate::providers::RequestOptions;
use crate::utils::AssistantError;

/// One analysis job. Fields are private so every instance has passed
/// validation; the `with_*` methods return new, re-validated copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    code: String,
    filename: String,
    enabled_analyzers: Vec<String>,
    options: BTreeMap<String, Value>,
    max_tokens: usize,
    use_cache: bool,
    timeout_seconds: u64,
}

impl AnalysisRequest {
    pub fn new(code: impl Into<String>, filename: impl Into<String>) -> Result<Self, AssistantError> {
        Self {
            code: code.into(),
            filename: filename.into(),
            enabled_analyzers: Vec::new(),
            options: BTreeMap::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            use_cache: true,
            timeout_seconds: HTTP_REQUEST_TIMEOUT_SECS,
        }
        .validated()
    }

    fn validated(self) -> Result<Self, AssistantError> {
        if self.code.trim().is_empty() {
            return Err(AssistantError::EmptyCode);
        }
        if self.max_tokens == 0 {
            return Err(AssistantError::InvalidRequest("Max tokens must be positive".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(AssistantError::InvalidRequest("Timeout must be positive".to_string()));
        }
        if self.enabled_analyzers.iter().any(|name| name.trim().is_empty()) {
            return Err(AssistantError::InvalidRequest(
                "All analyzer names must be non-empty strings".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn with_code(&self, code: impl Into<String>) -> Result<Self, AssistantError> {
        Self { code: code.into(), ..self.clone() }.validated()
    }

    pub fn with_filename(&self, filename: impl Into<String>) -> Result<Self, AssistantError> {
        Self { filename: filename.into(), ..self.clone() }.validated()
    }

    pub fn with_analyzers<I, S>(&self, analyzers: I) -> Result<Self, AssistantError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled_analyzers: analyzers.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
        .validated()
    }

    pub fn with_options(&self, options: BTreeMap<String, Value>) -> Result<Self, AssistantError> {
        Self { options, ..self.clone() }.validated()
    }

    pub fn with_caching(&self, use_cache: bool) -> Result<Self, AssistantError> {
        Self { use_cache, ..self.clone() }.validated()
    }

    pub fn with_max_tokens(&self, max_tokens: usize) -> Result<Self, AssistantError> {
        Self { max_tokens, ..self.clone() }.validated()
    }

    pub fn with_timeout(&self, timeout_seconds: u64) -> Result<Self, AssistantError> {
        Self { timeout_seconds, ..self.clone() }.validated()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Empty means "use the configured default set"
    pub fn enabled_analyzers(&self) -> &[String] {
        &self.enabled_analyzers
    }

    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Extension of `filename` without the dot, or "" when there is none
    pub fn file_extension(&self) -> &str {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    }

    pub fn has_analyzer(&self, analyzer: &str) -> bool {
        self.enabled_analyzers.iter().any(|name| name == analyzer)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Provider options derived from this request
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .with_max_tokens(self.max_tokens)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}
