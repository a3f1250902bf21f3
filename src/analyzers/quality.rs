use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{render_prompt, run_prompt, Analyzer};
use super::types::AnalyzerResult;
use crate::providers::{ProviderChain, RequestOptions};
use crate::utils::AssistantError;

const CHECKLIST: &[&str] = &[
    "SOLID principles violations",
    "Code complexity (cyclomatic complexity, nesting depth)",
    "Code duplication",
    "Naming conventions",
    "Class and method size",
    "Design patterns usage",
    "Error handling practices",
    "Type declarations and strict types",
    "PSR compliance (PSR-1, PSR-2, PSR-4, PSR-12)",
    "Framework best practices",
];

const SCHEMA: &str = r#"{
    "quality_score": "1-10 scale",
    "issues": [
        {
            "line": number,
            "type": "quality_issue_type",
            "severity": "info|warning|error",
            "message": "Description of the quality issue",
            "suggestion": "How to improve it"
        }
    ],
    "metrics": {
        "complexity": "low|medium|high",
        "maintainability": "low|medium|high",
        "readability": "low|medium|high"
    },
    "summary": "Overall code quality assessment"
}"#;

pub struct QualityAnalyzer {
    chain: Arc<ProviderChain>,
}

impl QualityAnalyzer {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub fn build_prompt(code: &str, filename: &str) -> String {
        render_prompt(
            "Analyze the following PHP code for code quality issues and best practices.",
            CHECKLIST,
            filename,
            code,
            SCHEMA,
        )
    }
}

#[async_trait]
impl Analyzer for QualityAnalyzer {
    fn name(&self) -> &str {
        "quality"
    }

    fn description(&self) -> &str {
        "Reviews SOLID principles, complexity, duplication, naming and PSR compliance"
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
            "quality_score",
            Self::build_prompt(code, filename),
            options,
        )
        .await
    }
}
