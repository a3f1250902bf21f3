use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::logger::preview;

/// Coarse grouping of [`AssistantError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Provider,
    Analysis,
    File,
    RateLimit,
    Storage,
}

/// Main error type for devassist
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {message}")]
    Configuration { key: Option<String>, message: String },

    #[error("Code cannot be empty")]
    EmptyCode,

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unsupported file type: {} (supported: {})", .path.display(), .supported.join(", "))]
    UnsupportedFileType { path: PathBuf, supported: Vec<String> },

    #[error("Code too large ({size} bytes). Maximum allowed size is {max} bytes")]
    CodeTooLarge { size: usize, max: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("All AI providers failed. Last error: {}", last_failure_message(.failures))]
    AllProvidersFailed { failures: Vec<ProviderError> },

    #[error("Analysis failed for '{file}': {source}")]
    Analysis {
        file: String,
        analyzer: Option<String>,
        #[source]
        source: Box<AssistantError>,
    },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("File is not readable: {}", .path.display())]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {} is too large ({size} bytes). Maximum allowed size is {max} bytes", .path.display())]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Rate limit exceeded for '{0}'")]
    RateLimited(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn last_failure_message(failures: &[ProviderError]) -> String {
    failures
        .last()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "No providers available".to_string())
}

impl AssistantError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            key: None,
            message: message.into(),
        }
    }

    pub fn invalid_config(key: &str, reason: impl fmt::Display) -> Self {
        Self::Configuration {
            key: Some(key.to_string()),
            message: format!("Invalid value for configuration '{}': {}", key, reason),
        }
    }

    /// Wrap an error with the file (and optionally analyzer) it occurred in
    pub fn analysis(file: impl Into<String>, analyzer: Option<&str>, source: AssistantError) -> Self {
        Self::Analysis {
            file: file.into(),
            analyzer: analyzer.map(str::to_string),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::EmptyCode
            | Self::InvalidSyntax(_)
            | Self::UnsupportedFileType { .. }
            | Self::CodeTooLarge { .. }
            | Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::Provider(_) | Self::AllProvidersFailed { .. } => ErrorKind::Provider,
            Self::Analysis { .. } | Self::Serialization(_) => ErrorKind::Analysis,
            Self::FileNotFound(_)
            | Self::FileNotReadable { .. }
            | Self::FileTooLarge { .. }
            | Self::DirectoryNotFound(_)
            | Self::Io(_) => ErrorKind::File,
            Self::RateLimited(_) => ErrorKind::RateLimit,
            Self::Store(_) => ErrorKind::Storage,
        }
    }

    /// Errors that mean the provider layer itself is unusable, not that one
    /// request went wrong. These abort an analysis run instead of being
    /// recorded against a single analyzer.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            Self::AllProvidersFailed { failures } => failures.is_empty(),
            Self::Configuration { .. } => true,
            Self::Analysis { source, .. } => source.is_infrastructure(),
            _ => false,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a runtime failure)
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Analysis { source, .. } => source.is_client_error(),
            other => matches!(other.kind(), ErrorKind::Validation | ErrorKind::File),
        }
    }
}

/// What went wrong talking to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Provider has no usable credentials
    Unavailable,
    Network,
    Timeout,
    AuthenticationFailed,
    RateLimited { retry_after: Option<Duration> },
    QuotaExceeded,
    InvalidResponse,
    Http { status: u16 },
}

/// Failure reported by a single provider adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(provider: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Unavailable,
            format!("Provider '{}' is not available", provider),
        )
    }

    pub fn network(provider: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Network,
            format!("Network error connecting to provider '{}': {}", provider, reason),
        )
    }

    pub fn timeout(provider: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Timeout,
            format!("Request to provider '{}' timed out", provider),
        )
    }

    pub fn authentication_failed(provider: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::AuthenticationFailed,
            format!("Authentication failed for provider '{}'. Check your API key.", provider),
        )
    }

    pub fn rate_limited(provider: &str, retry_after: Option<Duration>) -> Self {
        let mut message = format!("Rate limit exceeded for provider '{}'", provider);
        if let Some(after) = retry_after {
            message.push_str(&format!(". Retry after {} seconds", after.as_secs()));
        }
        Self::new(provider, ProviderErrorKind::RateLimited { retry_after }, message)
    }

    pub fn quota_exceeded(provider: &str) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::QuotaExceeded,
            format!("API quota exceeded for provider '{}'", provider),
        )
    }

    pub fn invalid_response(provider: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::InvalidResponse,
            format!("Invalid response from provider '{}': {}", provider, reason),
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(provider: &str, status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        match status {
            401 | 403 => Self::authentication_failed(provider),
            402 => Self::quota_exceeded(provider),
            429 => Self::rate_limited(provider, retry_after),
            _ => Self::new(
                provider,
                ProviderErrorKind::Http { status },
                format!("Provider '{}' returned HTTP {}: {}", provider, status, preview(body, 200)),
            ),
        }
    }

    /// HTTP-like status code for this failure (0 when there is none)
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ProviderErrorKind::AuthenticationFailed => 401,
            ProviderErrorKind::QuotaExceeded => 402,
            ProviderErrorKind::RateLimited { .. } => 429,
            ProviderErrorKind::Timeout => 408,
            ProviderErrorKind::Http { status } => status,
            ProviderErrorKind::Unavailable
            | ProviderErrorKind::Network
            | ProviderErrorKind::InvalidResponse => 0,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::Network
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::RateLimited { .. } => true,
            ProviderErrorKind::Http { status } => status >= 500,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            ProviderErrorKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }
}
