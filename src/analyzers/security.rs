use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{render_prompt, run_prompt, Analyzer};
use super::types::AnalyzerResult;
use crate::providers::{ProviderChain, RequestOptions};
use crate::utils::AssistantError;

const CHECKLIST: &[&str] = &[
    "SQL injection vulnerabilities",
    "XSS (Cross-Site Scripting) vulnerabilities",
    "CSRF (Cross-Site Request Forgery) issues",
    "Input validation problems",
    "Authentication and authorization flaws",
    "File upload security issues",
    "Information disclosure vulnerabilities",
    "Insecure cryptographic practices",
];

const SCHEMA: &str = r#"{
    "severity": "low|medium|high|critical",
    "security_score": "1-10 scale",
    "issues": [
        {
            "line": number,
            "type": "vulnerability_type",
            "severity": "low|medium|high|critical",
            "message": "Description of the issue",
            "suggestion": "How to fix it"
        }
    ],
    "summary": "Overall security assessment"
}"#;

/// Injection, XSS, CSRF, auth and crypto review
pub struct SecurityAnalyzer {
    chain: Arc<ProviderChain>,
}

impl SecurityAnalyzer {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    pub fn build_prompt(code: &str, filename: &str) -> String {
        render_prompt(
            "Analyze the following PHP code for security vulnerabilities and issues.",
            CHECKLIST,
            filename,
            code,
            SCHEMA,
        )
    }
}

#[async_trait]
impl Analyzer for SecurityAnalyzer {
    fn name(&self) -> &str {
        "security"
    }

    fn description(&self) -> &str {
        "Detects vulnerabilities such as SQL injection, XSS, CSRF and insecure cryptography"
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
            "security_score",
            Self::build_prompt(code, filename),
            options,
        )
        .await
    }
}
