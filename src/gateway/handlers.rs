use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::response::GatewayResponse;
use crate::analysis::CodeAnalyzer;
use crate::app::RateLimitConfig;
use crate::ratelimit::RateLimiter;
use crate::store::KeyValueStore;
use crate::utils::AssistantError;

const MINUTE: u64 = 60;
const HOUR: u64 = 3600;

#[derive(Debug, Deserialize)]
struct AnalyzePayload {
    code: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    analyzers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeFilePayload {
    file_path: Option<PathBuf>,
    #[serde(default)]
    analyzers: Option<Vec<String>>,
}

/// Endpoint logic for analysis requests: rate limiting, payload checks and
/// error-to-status mapping in front of a [`CodeAnalyzer`]
pub struct RequestGateway {
    analyzer: Arc<CodeAnalyzer>,
    limiter: RateLimiter,
    limits: RateLimitConfig,
    max_code_size: usize,
}

impl RequestGateway {
    pub fn new(
        analyzer: Arc<CodeAnalyzer>,
        store: Arc<dyn KeyValueStore>,
        limits: RateLimitConfig,
        max_code_size: usize,
    ) -> Self {
        Self {
            analyzer,
            limiter: RateLimiter::new(store),
            limits,
            max_code_size,
        }
    }

    /// Per-endpoint minute window and the shared hourly window. Both are
    /// checked before either is counted, so a rejected request uses no slot.
    fn check_limits(&self, endpoint: &str, client: &str, per_minute: u32) -> Option<GatewayResponse> {
        let minute_key = format!("{}:{}", endpoint, client);
        let hourly_key = format!("hourly:{}", client);

        if self.limiter.current_count(&minute_key, MINUTE) >= per_minute {
            return Some(GatewayResponse::too_many_requests(MINUTE));
        }
        if self.limiter.current_count(&hourly_key, HOUR) >= self.limits.requests_per_hour {
            return Some(GatewayResponse::too_many_requests(HOUR));
        }

        if !self.limiter.is_allowed(&minute_key, per_minute, MINUTE) {
            return Some(GatewayResponse::too_many_requests(MINUTE));
        }
        if !self.limiter.is_allowed(&hourly_key, self.limits.requests_per_hour, HOUR) {
            return Some(GatewayResponse::too_many_requests(HOUR));
        }
        None
    }

    /// `{code, filename?, analyzers?}`
    pub async fn analyze(&self, client: &str, payload: &Value) -> GatewayResponse {
        if let Some(limited) = self.check_limits("analyze", client, self.limits.requests_per_minute) {
            warn!(client, "Analyze request rate limited");
            return limited;
        }

        let payload: AnalyzePayload = match serde_json::from_value(payload.clone()) {
            Ok(payload) => payload,
            Err(e) => return GatewayResponse::bad_request(format!("Invalid request: {}", e)),
        };
        let Some(code) = payload.code else {
            return GatewayResponse::bad_request("Invalid request. Code parameter is required.");
        };
        if code.len() > self.max_code_size {
            return GatewayResponse::bad_request(format!(
                "Code too large. Maximum size is {} bytes.",
                self.max_code_size
            ));
        }

        let filename = payload.filename.unwrap_or_default();
        match self
            .analyzer
            .analyze_code(&code, &filename, payload.analyzers.as_deref())
            .await
        {
            Ok(result) => {
                info!(
                    client,
                    filename = %filename,
                    risk_score = result.risk_score,
                    total_issues = result.summary.total,
                    "Code analysis completed"
                );
                to_response(&result)
            }
            Err(e) => error_response("Analysis failed", client, &e),
        }
    }

    /// `{file_path, analyzers?}`
    pub async fn analyze_file(&self, client: &str, payload: &Value) -> GatewayResponse {
        if let Some(limited) = self.check_limits("analyze_file", client, self.limits.file_requests_per_minute) {
            warn!(client, "File analysis request rate limited");
            return limited;
        }

        let payload: AnalyzeFilePayload = match serde_json::from_value(payload.clone()) {
            Ok(payload) => payload,
            Err(e) => return GatewayResponse::bad_request(format!("Invalid request: {}", e)),
        };
        let Some(path) = payload.file_path else {
            return GatewayResponse::bad_request("Invalid request. file_path parameter is required.");
        };

        let validator = self.analyzer.validator();
        if !validator.is_supported(&path) {
            return GatewayResponse::bad_request(format!(
                "File type not supported. Allowed: {}",
                validator.supported_extensions().join(", ")
            ));
        }

        match self.analyzer.analyze_file(&path, payload.analyzers.as_deref()).await {
            Ok(result) => {
                info!(
                    client,
                    file_path = %path.display(),
                    risk_score = result.risk_score,
                    total_issues = result.summary.total,
                    "File analysis completed"
                );
                to_response(&result)
            }
            Err(e) => error_response("File analysis failed", client, &e),
        }
    }

    pub fn analyzers(&self) -> GatewayResponse {
        let analyzers: Vec<Value> = self
            .analyzer
            .analyzer_descriptions()
            .into_iter()
            .map(|(name, description)| json!({ "name": name, "description": description }))
            .collect();
        GatewayResponse::ok(json!({ "analyzers": analyzers }))
    }

    pub fn health(&self) -> GatewayResponse {
        let providers = self.analyzer.chain().available_providers();
        let status = if providers.is_empty() { "degraded" } else { "ok" };
        GatewayResponse::ok(json!({
            "status": status,
            "timestamp": Utc::now().to_rfc3339(),
            "analyzers": self.analyzer.analyzer_names(),
            "providers": providers,
            "cache": self.analyzer.cache_metrics(),
        }))
    }
}

fn to_response<T: serde::Serialize>(value: &T) -> GatewayResponse {
    match serde_json::to_value(value) {
        Ok(body) => GatewayResponse::ok(body),
        Err(e) => GatewayResponse::error(500, format!("Failed to encode result: {}", e)),
    }
}

fn root_cause(err: &AssistantError) -> &AssistantError {
    match err {
        AssistantError::Analysis { source, .. } => root_cause(source),
        other => other,
    }
}

fn error_response(context: &str, client: &str, err: &AssistantError) -> GatewayResponse {
    let status = match root_cause(err) {
        AssistantError::FileNotFound(_) | AssistantError::DirectoryNotFound(_) => 404,
        AssistantError::RateLimited(_) => 429,
        cause if cause.is_client_error() => 400,
        _ => 500,
    };
    if status >= 500 {
        error!(client, "{} endpoint error: {}", context, err);
    } else {
        warn!(client, status, "{} request rejected: {}", context, err);
    }
    GatewayResponse::error(status, format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{InputValidator, NoopSyntaxChecker};
    use crate::analyzers::{Analyzer, Severity};
    use crate::app::AnalysisConfig;
    use crate::cache::{ResponseCache, ResultCache};
    use crate::providers::ProviderChain;
    use crate::store::MemoryStore;
    use crate::testing::{MockAnalyzer, MockProvider};
    use std::time::Duration;
    use tempfile::TempDir;

    fn gateway(limits: RateLimitConfig, max_code_size: usize) -> RequestGateway {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(MockAnalyzer::with_issues("security", &[Severity::High])),
            Arc::new(MockAnalyzer::with_issues("quality", &[])),
        ];
        let chain = ProviderChain::new(vec![Arc::new(MockProvider::new("openai", 30, "{}"))]);
        let analyzer = CodeAnalyzer::new(
            Arc::new(chain),
            analyzers,
            ResponseCache::new(store.clone()),
            ResultCache::new(store.clone(), "result", true, Duration::from_secs(60)),
            InputValidator::new(Arc::new(NoopSyntaxChecker), &AnalysisConfig::default()),
        );
        RequestGateway::new(Arc::new(analyzer), store, limits, max_code_size)
    }

    fn default_gateway() -> RequestGateway {
        gateway(RateLimitConfig::default(), 1024)
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let response = default_gateway()
            .analyze("10.0.0.1", &json!({ "code": "<?php echo 1;", "filename": "a.php" }))
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["summary"]["total"], 1);
        assert_eq!(response.body["risk_level"], "medium");
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_payloads() {
        let gateway = default_gateway();
        assert_eq!(gateway.analyze("c", &json!({ "filename": "a.php" })).await.status, 400);
        assert_eq!(gateway.analyze("c", &json!({ "code": 42 })).await.status, 400);
        assert_eq!(gateway.analyze("c", &json!({ "code": "x".repeat(1025) })).await.status, 400);
        assert_eq!(gateway.analyze("c", &json!({ "code": "   " })).await.status, 400);

        let unknown = gateway
            .analyze("c", &json!({ "code": "x", "analyzers": ["style"] }))
            .await;
        assert_eq!(unknown.status, 400);
        assert!(unknown.error_message().unwrap().contains("style"));
    }

    #[tokio::test]
    async fn test_rate_limit_per_client() {
        let limits = RateLimitConfig {
            requests_per_minute: 2,
            ..RateLimitConfig::default()
        };
        let gateway = gateway(limits, 1024);
        let payload = json!({ "code": "x" });

        assert_eq!(gateway.analyze("a", &payload).await.status, 200);
        assert_eq!(gateway.analyze("a", &payload).await.status, 200);
        let limited = gateway.analyze("a", &payload).await;
        assert_eq!(limited.status, 429);
        assert_eq!(limited.body["retry_after"], 60);
        assert_eq!(gateway.analyze("b", &payload).await.status, 200);
    }

    #[tokio::test]
    async fn test_hourly_limit_is_shared() {
        let limits = RateLimitConfig {
            requests_per_hour: 1,
            ..RateLimitConfig::default()
        };
        let gateway = gateway(limits, 1024);
        assert_eq!(gateway.analyze("a", &json!({ "code": "x" })).await.status, 200);
        let limited = gateway.analyze_file("a", &json!({ "file_path": "a.php" })).await;
        assert_eq!(limited.status, 429);
        assert_eq!(limited.body["retry_after"], 3600);
    }

    #[tokio::test]
    async fn test_rejected_requests_use_no_slot() {
        let limits = RateLimitConfig {
            requests_per_minute: 1,
            requests_per_hour: 2,
            ..RateLimitConfig::default()
        };
        let gateway = gateway(limits, 1024);
        let payload = json!({ "code": "x" });

        assert_eq!(gateway.analyze("a", &payload).await.status, 200);
        assert_eq!(gateway.analyze("a", &payload).await.status, 429);
        assert_eq!(gateway.limiter.current_count("hourly:a", HOUR), 1);

        assert_eq!(gateway.analyze_file("a", &json!({ "file_path": "a.php" })).await.status, 404);
        assert_eq!(gateway.limiter.current_count("hourly:a", HOUR), 2);

        let limited = gateway.analyze_file("a", &json!({ "file_path": "b.php" })).await;
        assert_eq!(limited.status, 429);
        assert_eq!(limited.body["retry_after"], 3600);
        assert_eq!(gateway.limiter.current_count("analyze_file:a", MINUTE), 1);
    }

    #[tokio::test]
    async fn test_analyze_file_statuses() {
        let dir = TempDir::new().unwrap();
        let gateway = default_gateway();

        let unsupported = gateway.analyze_file("c", &json!({ "file_path": "notes.txt" })).await;
        assert_eq!(unsupported.status, 400);
        assert!(unsupported.error_message().unwrap().contains("php"));

        let missing = dir.path().join("missing.php");
        let response = gateway.analyze_file("c", &json!({ "file_path": missing })).await;
        assert_eq!(response.status, 404);

        assert_eq!(gateway.analyze_file("c", &json!({})).await.status, 400);

        let file = dir.path().join("index.php");
        std::fs::write(&file, "<?php echo 1;").unwrap();
        let response = gateway.analyze_file("c", &json!({ "file_path": file })).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body["summary"]["high"], 1);
    }

    #[test]
    fn test_analyzers_and_health() {
        let gateway = default_gateway();
        let analyzers = gateway.analyzers();
        assert_eq!(analyzers.body["analyzers"][0]["name"], "security");

        let health = gateway.health();
        assert_eq!(health.status, 200);
        assert_eq!(health.body["status"], "ok");
        assert_eq!(health.body["providers"], json!(["openai"]));
        assert_eq!(health.body["cache"]["enabled"], true);
    }

    #[test]
    fn test_error_status_mapping() {
        let wrapped = AssistantError::analysis(
            "a.php",
            Some("security"),
            AssistantError::AllProvidersFailed { failures: vec![] },
        );
        assert_eq!(error_response("Analysis failed", "c", &wrapped).status, 500);
        assert_eq!(
            error_response("Analysis failed", "c", &AssistantError::InvalidSyntax("x".into())).status,
            400
        );
    }
}
