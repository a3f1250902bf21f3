use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::traits::AnalysisObserver;
use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::utils::{AssistantError, ProviderError, ProviderErrorKind};

/// Logs each stage of an analysis and every provider failure
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl AnalysisObserver for LoggingObserver {
    fn before_analysis(&self, request: &AnalysisRequest) {
        info!(
            filename = request.filename(),
            code_length = request.code().len(),
            analyzers = ?request.enabled_analyzers(),
            use_cache = request.use_cache(),
            "Starting code analysis"
        );
    }

    fn after_analysis(&self, request: &AnalysisRequest, result: &AnalysisResult, elapsed: Duration) {
        info!(
            filename = request.filename(),
            elapsed_ms = elapsed.as_millis() as u64,
            successful = result.is_successful(),
            cached = result.cached,
            execution_time_ms = result.execution_time_ms,
            analyzer_count = result.analyzers.len(),
            total_issues = result.summary.total,
            "Completed code analysis"
        );
        if !result.is_successful() {
            let failed: Vec<&str> = result.errors.iter().map(|e| e.analyzer.as_str()).collect();
            warn!(filename = request.filename(), failed = ?failed, "Analysis completed with errors");
        }
    }

    fn analysis_failed(&self, request: &AnalysisRequest, error: &AssistantError) {
        if error.is_client_error() {
            warn!(filename = request.filename(), "Analysis rejected: {}", error);
        } else {
            error!(filename = request.filename(), "Analysis failed: {}", error);
        }
    }

    fn provider_failed(&self, err: &ProviderError) {
        error!(
            provider = %err.provider,
            status = err.status_code(),
            retryable = err.is_retryable(),
            "AI provider failure: {}",
            err.message
        );
        match &err.kind {
            ProviderErrorKind::RateLimited { retry_after } => warn!(
                provider = %err.provider,
                retry_after_secs = retry_after.map(|d| d.as_secs()),
                "Rate limit exceeded for AI provider"
            ),
            ProviderErrorKind::AuthenticationFailed => {
                error!(provider = %err.provider, "Authentication failed, check the API key configuration")
            }
            ProviderErrorKind::QuotaExceeded => {
                error!(provider = %err.provider, "API quota exceeded, review usage limits and billing")
            }
            _ => {}
        }
    }

    fn provider_succeeded(&self, provider: &str) {
        debug!(provider, "AI provider answered");
    }
}
