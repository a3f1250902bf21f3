use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::store::KeyValueStore;
use crate::utils::{sha256_hex, AssistantError};

/// Fixed-window request counter per caller identity.
///
/// Counters reset at aligned window boundaries, so a burst straddling a
/// boundary can see up to `2 * max_requests` within one rolling window.
/// Store failures fail open.
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `rate_limit:{sha256(identity)}:{window_start}`
    fn key(identity: &str, window_start: u64) -> String {
        format!("rate_limit:{}:{}", sha256_hex(identity), window_start)
    }

    fn window_start(now_secs: u64, window_secs: u64) -> u64 {
        now_secs / window_secs * window_secs
    }

    pub fn is_allowed(&self, identity: &str, max_requests: u32, window_secs: u64) -> bool {
        self.is_allowed_at(identity, max_requests, window_secs, now_secs())
    }

    /// [`RateLimiter::is_allowed`] against an explicit clock
    pub fn is_allowed_at(&self, identity: &str, max_requests: u32, window_secs: u64, now_secs: u64) -> bool {
        if window_secs == 0 {
            warn!(identity, "Rate limit window of zero seconds, allowing request");
            return true;
        }

        match self.check_and_increment(identity, max_requests, window_secs, now_secs) {
            Ok(allowed) => allowed,
            Err(e) => {
                error!(identity, "Rate limiter error, allowing request: {}", e);
                true
            }
        }
    }

    fn check_and_increment(
        &self,
        identity: &str,
        max_requests: u32,
        window_secs: u64,
        now_secs: u64,
    ) -> Result<bool, AssistantError> {
        let window_start = Self::window_start(now_secs, window_secs);
        let key = Self::key(identity, window_start);
        let ttl = Duration::from_secs(window_secs);

        let Some(current) = self.store.get(&key)?.map(|bytes| decode_count(&bytes)) else {
            self.store.set(&key, encode_count(1), ttl)?;
            debug!(identity, window = window_secs, "Rate limit: first request in window");
            return Ok(true);
        };

        if current >= max_requests {
            warn!(
                identity,
                current_count = current,
                max_requests,
                window = window_secs,
                "Rate limit exceeded"
            );
            return Ok(false);
        }

        self.store.set(&key, encode_count(current + 1), ttl)?;
        debug!(identity, count = current + 1, max_requests, "Rate limit: request allowed");
        Ok(true)
    }

    /// Requests counted in the current window (0 on a miss or store error)
    pub fn current_count(&self, identity: &str, window_secs: u64) -> u32 {
        self.current_count_at(identity, window_secs, now_secs())
    }

    pub fn current_count_at(&self, identity: &str, window_secs: u64, now_secs: u64) -> u32 {
        if window_secs == 0 {
            return 0;
        }
        let key = Self::key(identity, Self::window_start(now_secs, window_secs));
        match self.store.get(&key) {
            Ok(Some(bytes)) => decode_count(&bytes),
            Ok(None) => 0,
            Err(e) => {
                error!(identity, "Rate limiter count error: {}", e);
                0
            }
        }
    }

    /// Delete the current window's counter; true if one existed
    pub fn reset(&self, identity: &str, window_secs: u64) -> bool {
        self.reset_at(identity, window_secs, now_secs())
    }

    pub fn reset_at(&self, identity: &str, window_secs: u64, now_secs: u64) -> bool {
        if window_secs == 0 {
            return false;
        }
        let key = Self::key(identity, Self::window_start(now_secs, window_secs));
        match self.store.delete(&key) {
            Ok(deleted) => {
                if deleted {
                    info!(identity, window = window_secs, "Rate limit reset");
                }
                deleted
            }
            Err(e) => {
                error!(identity, "Rate limiter reset error: {}", e);
                false
            }
        }
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn encode_count(count: u32) -> Vec<u8> {
    count.to_string().into_bytes()
}

/// Unreadable counters count as zero
fn decode_count(bytes: &[u8]) -> u32 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
