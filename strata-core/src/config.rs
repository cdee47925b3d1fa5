//! Per-adapter resilience configuration.
//!
//! One explicit config record per adapter instance, passed at construction.
//! There is no ambient or static configuration anywhere in Strata; this is
//! what lets each tier's resilience behavior be tested independently.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one adapter's resilience envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Token-bucket capacity: calls allowed per window.
    pub max_calls: u32,
    /// Token-bucket window in seconds; refill is continuous at
    /// `max_calls / per_seconds` tokens per second.
    pub per_seconds: f64,
    /// Retries after the first attempt. Zero disables retry.
    pub retries: u32,
    /// Initial retry backoff; doubles per attempt up to `max_delay`.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Hard deadline per attempt.
    pub timeout: Duration,
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a trial call.
    pub recovery_timeout: Duration,
    /// TTL for the envelope's response cache. This is a de-duplication
    /// cache, not the tier itself; keep it far shorter than domain TTLs.
    pub response_cache_ttl: Duration,
    /// Maximum entries in the response cache before LRU eviction.
    pub response_cache_size: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            per_seconds: 1.0,
            retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            response_cache_ttl: Duration::from_secs(30),
            response_cache_size: 256,
        }
    }
}

impl ResilienceConfig {
    /// Hot-tier preset: aggressive timeouts, high throughput, fast recovery.
    pub fn hot() -> Self {
        Self {
            max_calls: 200,
            per_seconds: 1.0,
            retries: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            timeout: Duration::from_millis(50),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(5),
            response_cache_ttl: Duration::from_secs(1),
            response_cache_size: 1024,
        }
    }

    /// Warm-tier preset: moderate timeouts, document-store throughput.
    pub fn warm() -> Self {
        Self {
            max_calls: 50,
            per_seconds: 1.0,
            retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(2),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            response_cache_ttl: Duration::from_secs(10),
            response_cache_size: 512,
        }
    }

    /// Cold-tier preset: lenient timeouts, low throughput, minimal retries
    /// (large payload transfers are not worth repeating aggressively).
    pub fn cold() -> Self {
        Self {
            max_calls: 10,
            per_seconds: 1.0,
            retries: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
            response_cache_ttl: Duration::from_secs(30),
            response_cache_size: 128,
        }
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the token-bucket rate.
    pub fn with_rate(mut self, max_calls: u32, per_seconds: f64) -> Self {
        self.max_calls = max_calls;
        self.per_seconds = per_seconds;
        self
    }

    /// Set the circuit-breaker thresholds.
    pub fn with_breaker(mut self, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        self.failure_threshold = failure_threshold;
        self.recovery_timeout = recovery_timeout;
        self
    }

    /// Set the response-cache TTL.
    pub fn with_response_cache_ttl(mut self, ttl: Duration) -> Self {
        self.response_cache_ttl = ttl;
        self
    }

    /// Upper bound on the whole retry loop, so retries cannot indefinitely
    /// extend latency: one timeout per attempt plus every backoff delay.
    pub fn retry_budget(&self) -> Duration {
        let attempts = self.retries + 1;
        let mut budget = self.timeout * attempts;
        let mut delay = self.base_delay;
        for _ in 0..self.retries {
            budget += delay.min(self.max_delay);
            delay *= 2;
        }
        budget
    }
}
