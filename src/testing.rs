//! Test doubles shared by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::analyzers::{Analyzer, AnalyzerResult, Issue, Severity};
use crate::providers::{Provider, RequestOptions};
use crate::utils::{AssistantError, ProviderError};

pub struct MockProvider {
    name: String,
    priority: i32,
    response: String,
    available: bool,
    should_fail: bool,
    call_count: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockProvider {
    pub fn new(name: &str, priority: i32, response: &str) -> Self {
        Self {
            name: name.to_string(),
            priority,
            response: response.to_string(),
            available: true,
            should_fail: false,
            call_count: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Available, but every request fails with a 503
    pub fn failing(name: &str, priority: i32) -> Self {
        Self {
            should_fail: true,
            ..Self::new(name, priority, "")
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn request(&self, prompt: &str, _options: &RequestOptions) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());
        if self.should_fail {
            return Err(ProviderError::from_status(&self.name, 503, None, "mock failure"));
        }
        Ok(self.response.clone())
    }
}

enum MockOutcome {
    Result(AnalyzerResult),
    InfrastructureFailure,
}

pub struct MockAnalyzer {
    name: String,
    outcome: MockOutcome,
    call_count: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(name: &str, result: AnalyzerResult) -> Self {
        Self {
            name: name.to_string(),
            outcome: MockOutcome::Result(result),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Reports one issue per severity given
    pub fn with_issues(name: &str, severities: &[Severity]) -> Self {
        let mut result = AnalyzerResult::new(name);
        result.issues = severities
            .iter()
            .enumerate()
            .map(|(i, severity)| Issue {
                line: Some(i as u32 + 1),
                issue_type: format!("{}_issue", name),
                severity: *severity,
                message: format!("{} issue {}", name, i + 1),
                suggestion: String::new(),
                analyzer: None,
            })
            .collect();
        Self::new(name, result)
    }

    /// Behaves as if no provider could be reached
    pub fn infrastructure_failure(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: MockOutcome::InfrastructureFailure,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock analyzer"
    }

    async fn analyze(
        &self,
        _code: &str,
        _filename: &str,
        _options: &RequestOptions,
    ) -> Result<AnalyzerResult, AssistantError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Result(result) => Ok(result.clone()),
            MockOutcome::InfrastructureFailure => Err(AssistantError::AllProvidersFailed { failures: vec![] }),
        }
    }
}
