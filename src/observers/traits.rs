use std::time::Duration;

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::utils::{AssistantError, ProviderError};

/// Hooks around the analysis pipeline. Every method defaults to a no-op so
/// implementors only override what they watch. `elapsed` is measured by the
/// caller per request, so overlapping runs of the same file stay separate.
pub trait AnalysisObserver: Send + Sync {
    fn before_analysis(&self, _request: &AnalysisRequest) {}

    fn after_analysis(&self, _request: &AnalysisRequest, _result: &AnalysisResult, _elapsed: Duration) {}

    fn analysis_failed(&self, _request: &AnalysisRequest, _error: &AssistantError) {}

    fn provider_failed(&self, _error: &ProviderError) {}

    fn provider_succeeded(&self, _provider: &str) {}
}
