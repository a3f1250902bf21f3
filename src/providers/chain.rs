use std::sync::Arc;
use tracing::{debug, info, warn};

use super::traits::{Provider, RequestOptions};
use crate::observers::AnalysisObserver;
use crate::utils::{AssistantError, ProviderError};

/// Successful chain response with the attempts that preceded it
#[derive(Debug, Clone)]
pub struct ChainResponse {
    pub text: String,
    pub provider: String,
    pub failures: Vec<ProviderError>,
}

/// Ordered provider fallback: highest priority first, first success wins
pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
    observers: Vec<Arc<dyn AnalysisObserver>>,
}

impl ProviderChain {
    pub fn new(mut providers: Vec<Arc<dyn Provider>>) -> Self {
        // stable sort keeps declaration order among equal priorities
        providers.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        Self {
            providers,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_observers(mut self, observers: impl IntoIterator<Item = Arc<dyn AnalysisObserver>>) -> Self {
        self.observers.extend(observers);
        self
    }

    /// Request a completion, returning only the text
    pub async fn request(&self, prompt: &str, options: &RequestOptions) -> Result<String, AssistantError> {
        self.request_detailed(prompt, options)
            .await
            .map(|response| response.text)
    }

    /// Request a completion and report which provider answered
    ///
    /// Unavailable providers are skipped without being called. Each failure
    /// is logged, passed to the observers, and the next provider is tried.
    /// No provider is retried.
    pub async fn request_detailed(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<ChainResponse, AssistantError> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            if !provider.is_available() {
                debug!(provider = provider.name(), "Skipping unavailable provider");
                continue;
            }

            match provider.request(prompt, options).await {
                Ok(text) => {
                    if !failures.is_empty() {
                        info!(
                            provider = provider.name(),
                            failed = failures.len(),
                            "Request succeeded after fallback"
                        );
                    }
                    for observer in &self.observers {
                        observer.provider_succeeded(provider.name());
                    }
                    return Ok(ChainResponse {
                        text,
                        provider: provider.name().to_string(),
                        failures,
                    });
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        status = err.status_code(),
                        retryable = err.is_retryable(),
                        "Provider failed, trying next: {}",
                        err
                    );
                    for observer in &self.observers {
                        observer.provider_failed(&err);
                    }
                    failures.push(err);
                }
            }
        }

        Err(AssistantError::AllProvidersFailed { failures })
    }

    /// Names of providers whose availability check passes, in try order
    pub fn available_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn has_available_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    /// Every configured provider with its availability, in try order
    pub fn provider_status(&self) -> Vec<(String, i32, bool)> {
        self.providers
            .iter()
            .map(|p| (p.name().to_string(), p.priority(), p.is_available()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::ProviderFailureTracker;
    use crate::testing::MockProvider;

    #[tokio::test]
    async fn test_falls_back_to_first_success() {
        let first = Arc::new(MockProvider::failing("first", 30));
        let second = Arc::new(MockProvider::failing("second", 20));
        let third = Arc::new(MockProvider::new("third", 10, "third response"));
        let fourth = Arc::new(MockProvider::new("fourth", 5, "never"));
        let tracker = Arc::new(ProviderFailureTracker::new());

        let chain = ProviderChain::new(vec![
            fourth.clone(),
            second.clone(),
            third.clone(),
            first.clone(),
        ])
        .with_observer(tracker.clone());

        let response = chain
            .request_detailed("prompt", &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(response.text, "third response");
        assert_eq!(response.provider, "third");
        assert_eq!(response.failures.len(), 2);
        assert_eq!(response.failures[0].provider, "first");
        assert_eq!(response.failures[1].provider, "second");
        assert_eq!(tracker.failure_count("first"), 1);
        assert_eq!(tracker.failure_count("second"), 1);
        assert_eq!(first.call_count(), 1);
        assert_eq!(third.call_count(), 1);
        assert_eq!(fourth.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_providers_are_skipped() {
        let offline = Arc::new(MockProvider::new("offline", 50, "nope").unavailable());
        let online = Arc::new(MockProvider::new("online", 1, "yes"));
        let chain = ProviderChain::new(vec![offline.clone(), online.clone()]);

        assert_eq!(chain.request("p", &RequestOptions::default()).await.unwrap(), "yes");
        assert_eq!(offline.call_count(), 0);
        assert_eq!(chain.available_providers(), vec!["online".to_string()]);
        assert!(chain.has_available_provider());
    }

    #[tokio::test]
    async fn test_all_failed_carries_every_failure() {
        let chain = ProviderChain::new(vec![
            Arc::new(MockProvider::failing("a", 2)),
            Arc::new(MockProvider::failing("b", 1)),
        ]);

        match chain.request("p", &RequestOptions::default()).await {
            Err(AssistantError::AllProvidersFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[1].provider, "b");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_available_provider_is_infrastructure_error() {
        let chain = ProviderChain::new(vec![Arc::new(
            MockProvider::new("x", 1, "r").unavailable(),
        )]);
        assert!(!chain.has_available_provider());

        let err = chain.request("p", &RequestOptions::default()).await.unwrap_err();
        assert!(err.is_infrastructure());
        assert!(err.to_string().contains("No providers available"));
    }
}
