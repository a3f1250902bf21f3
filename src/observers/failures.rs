use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

use super::traits::AnalysisObserver;
use crate::utils::{ProviderError, ProviderErrorKind};

const DEFAULT_ALERT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderHealth {
    pub total_failures: u32,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

/// Per-provider failure counts with an alert once a provider keeps failing
pub struct ProviderFailureTracker {
    alert_threshold: u32,
    providers: Mutex<BTreeMap<String, ProviderHealth>>,
}

impl Default for ProviderFailureTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFailureTracker {
    pub fn new() -> Self {
        Self::with_alert_threshold(DEFAULT_ALERT_THRESHOLD)
    }

    pub fn with_alert_threshold(alert_threshold: u32) -> Self {
        Self {
            alert_threshold: alert_threshold.max(1),
            providers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn failure_count(&self, provider: &str) -> u32 {
        self.providers
            .lock()
            .get(provider)
            .map_or(0, |health| health.total_failures)
    }

    pub fn consecutive_failures(&self, provider: &str) -> u32 {
        self.providers
            .lock()
            .get(provider)
            .map_or(0, |health| health.consecutive_failures)
    }

    /// Providers currently at or over the consecutive-failure threshold
    pub fn alerts(&self) -> Vec<String> {
        self.providers
            .lock()
            .iter()
            .filter(|(_, health)| health.consecutive_failures >= self.alert_threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ProviderHealth> {
        self.providers.lock().clone()
    }
}

fn failure_type(kind: &ProviderErrorKind) -> &'static str {
    match kind {
        ProviderErrorKind::AuthenticationFailed => "authentication",
        ProviderErrorKind::QuotaExceeded => "quota_exceeded",
        ProviderErrorKind::RateLimited { .. } => "rate_limit",
        ProviderErrorKind::Network | ProviderErrorKind::Timeout => "network_error",
        ProviderErrorKind::InvalidResponse => "invalid_response",
        ProviderErrorKind::Unavailable => "unavailable",
        ProviderErrorKind::Http { .. } => "http_error",
    }
}

impl AnalysisObserver for ProviderFailureTracker {
    fn provider_failed(&self, err: &ProviderError) {
        let mut providers = self.providers.lock();
        let health = providers.entry(err.provider.clone()).or_default();
        health.total_failures += 1;
        health.consecutive_failures += 1;
        health.last_error = Some(err.message.clone());

        debug!(
            provider = %err.provider,
            failure_type = failure_type(&err.kind),
            total_failures = health.total_failures,
            "Updated provider failure metrics"
        );

        if health.consecutive_failures == self.alert_threshold {
            error!(
                provider = %err.provider,
                consecutive_failures = health.consecutive_failures,
                "AI provider is failing repeatedly"
            );
        }
    }

    fn provider_succeeded(&self, provider: &str) {
        if let Some(health) = self.providers.lock().get_mut(provider) {
            health.consecutive_failures = 0;
        }
    }
}
