use async_trait::async_trait;
use tracing::warn;

use super::parser::parse_response;
use super::types::AnalyzerResult;
use crate::providers::{ProviderChain, RequestOptions};
use crate::utils::AssistantError;

/// One issue category: a prompt template plus a response parser
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Analyze a snippet.
    ///
    /// Provider and parse failures come back as a result with `error` set.
    /// `Err` is reserved for infrastructure failures (no provider could even
    /// be tried) that should abort the whole run.
    async fn analyze(
        &self,
        code: &str,
        filename: &str,
        options: &RequestOptions,
    ) -> Result<AnalyzerResult, AssistantError>;
}

/// Send a prompt through the chain and parse the reply
pub(super) async fn run_prompt(
    chain: &ProviderChain,
    analyzer: &str,
    score_field: &str,
    prompt: String,
    options: &RequestOptions,
) -> Result<AnalyzerResult, AssistantError> {
    match chain.request(&prompt, options).await {
        Ok(response) => Ok(parse_response(analyzer, score_field, &response)),
        Err(err) if err.is_infrastructure() => Err(err),
        Err(err) => {
            warn!(analyzer, prompt_length = prompt.len(), "Analyzer request failed: {}", err);
            Ok(AnalyzerResult::failed(
                analyzer,
                format!("Failed to analyze {}: {}", analyzer, err),
            ))
        }
    }
}

/// Shared prompt layout: checklist, file, fenced code, response schema
pub(super) fn render_prompt(intro: &str, checklist: &[&str], filename: &str, code: &str, schema: &str) -> String {
    let mut prompt = format!("{} Focus on:\n\n", intro);
    for (i, item) in checklist.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, item));
    }
    prompt.push_str(&format!(
        "\nFile: {}\n\nCode:\n```php\n{}\n```\n\nProvide your analysis in JSON format:\n{}\n",
        filename, code, schema
    ));
    prompt
}
