use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{render_prompt, run_prompt, Analyzer};
use super::types::AnalyzerResult;
use crate::providers::{ProviderChain, RequestOptions};
use crate::utils::AssistantError;

const CHECKLIST: &[&str] = &[
    "Database query optimization (N+1 queries, missing indexes)",
    "Memory usage issues (large arrays, memory leaks)",
    "CPU-intensive operations (nested loops, inefficient algorithms)",
    "I/O operations (file operations, network calls)",
    "Caching opportunities",
    "Framework-specific performance issues (service container, event listeners)",
    "Array and collection performance",
    "String manipulation efficiency",
];

// issues carry "impact" rather than "severity"; the parser maps it
const SCHEMA: &str = r#"{
    "performance_score": "1-10 scale",
    "issues": [
        {
            "line": number,
            "type": "performance_issue_type",
            "impact": "low|medium|high",
            "message": "Description of the performance issue",
            "suggestion": "How to optimize it"
        }
    ],
    "optimizations": [
        {
            "description": "Optimization opportunity",
            "impact": "Expected performance improvement"
        }
    ],
    "summary": "Overall performance assessment"
}"#;

pub struct PerformanceAnalyzer {
    chain: Arc<ProviderChain>,
}

impl PerformanceAnalyzer {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub fn build_prompt(code: &str, filename: &str) -> String {
        render_prompt(
            "Analyze the following PHP code for performance issues and optimization opportunities.",
            CHECKLIST,
            filename,
            code,
            SCHEMA,
        )
    }
}

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &str {
        "performance"
    }

    fn description(&self) -> &str {
        "Finds N+1 queries, memory hogs, expensive loops and caching opportunities"
    }

    async fn analyze(
        &self,
        code: &str,
        filename: &str,
        options: &RequestOptions,
    ) -> Result<AnalyzerResult, AssistantError> {
        run_prompt(
            &self.chain,
            self.name(),
            "performance_score",
            Self::build_prompt(code, filename),
            options,
        )
        .await
    }
}
