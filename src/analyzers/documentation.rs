use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{render_prompt, run_prompt, Analyzer};
use super::types::AnalyzerResult;
use crate::providers::{ProviderChain, RequestOptions};
use crate::utils::AssistantError;

const CHECKLIST: &[&str] = &[
    "PHPDoc blocks for classes, methods, and properties",
    "Parameter and return type documentation",
    "Exception documentation (@throws)",
    "Code comments quality and usefulness",
    "API documentation completeness",
    "Usage examples in documentation",
    "Deprecation notices",
    "@author, @since, @version tags",
    "Interface and abstract class documentation",
    "Complex logic explanation",
];

const SCHEMA: &str = r#"{
    "documentation_score": "1-10 scale",
    "issues": [
        {
            "line": number,
            "type": "documentation_issue_type",
            "severity": "info|warning|error",
            "message": "Description of the documentation issue",
            "suggestion": "How to improve the documentation"
        }
    ],
    "coverage": {
        "classes": "percentage or assessment",
        "methods": "percentage or assessment",
        "properties": "percentage or assessment"
    },
    "suggestions": [
        "General documentation improvement suggestions"
    ],
    "summary": "Overall documentation assessment"
}"#;

pub struct DocumentationAnalyzer {
    chain: Arc<ProviderChain>,
}

impl DocumentationAnalyzer {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub fn build_prompt(code: &str, filename: &str) -> String {
        render_prompt(
            "Analyze the following PHP code for documentation quality and completeness.",
            CHECKLIST,
            filename,
            code,
            SCHEMA,
        )
    }
}

#[async_trait]
impl Analyzer for DocumentationAnalyzer {
    fn name(&self) -> &str {
        "documentation"
    }

    fn description(&self) -> &str {
        "Checks PHPDoc coverage, parameter and exception docs, and comment quality"
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
            "documentation_score",
            Self::build_prompt(code, filename),
            options,
        )
        .await
    }
}
