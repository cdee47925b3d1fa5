//! STRATA Resilience - The Envelope Around Every Tier Access
//!
//! [`ResilienceEnvelope`] wraps an arbitrary asynchronous unit of work with
//! five composable behaviors, applied in this fixed order on the way in:
//!
//! 1. Rate limiting (blocking token bucket)
//! 2. Response caching (read-shaped operations only)
//! 3. Timeout (hard per-attempt deadline)
//! 4. Retry with exponential backoff and jitter, bounded by a retry budget
//! 5. Circuit breaking (Closed/Open/HalfOpen)
//!
//! The envelope is per-adapter-instance: its counters, cache, and breaker
//! are never shared across tiers, so a hot-tier outage cannot degrade warm
//! or cold availability.

pub mod breaker;
pub mod response_cache;
pub mod token_bucket;

pub use breaker::{BreakerState, CircuitBreaker};
pub use response_cache::ResponseCache;
pub use token_bucket::TokenBucket;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use strata_core::{
    AdapterError, CallRecord, Outcome, ResilienceConfig, TelemetrySink, Tier, Value,
};

/// Point-in-time view of an envelope's internal state, for health checks.
#[derive(Debug, Clone)]
pub struct EnvelopeSnapshot {
    /// Which tier this envelope guards.
    pub tier: Tier,
    /// Current breaker state.
    pub breaker: BreakerState,
    /// Tokens currently available in the rate limiter.
    pub available_tokens: f64,
    /// Live entries in the response cache.
    pub cached_responses: usize,
    /// Lifetime response-cache hits.
    pub cache_hits: u64,
    /// Lifetime response-cache misses.
    pub cache_misses: u64,
}

/// Uniform resilience wrapper for one adapter's backing-store calls.
///
/// Stateless apart from its internal counters and windows; safe for
/// concurrent use from multiple in-flight gateway calls (every critical
/// section is a tiny mutex-guarded window).
pub struct ResilienceEnvelope {
    tier: Tier,
    config: ResilienceConfig,
    bucket: TokenBucket,
    cache: ResponseCache,
    breaker: CircuitBreaker,
    sink: Arc<dyn TelemetrySink>,
}

impl ResilienceEnvelope {
    /// Create an envelope for the given tier with the given configuration.
    pub fn new(tier: Tier, config: ResilienceConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        let bucket = TokenBucket::new(config.max_calls, config.per_seconds);
        let cache = ResponseCache::new(config.response_cache_ttl, config.response_cache_size);
        let breaker = CircuitBreaker::new(config.failure_threshold, config.recovery_timeout);
        Self {
            tier,
            config,
            bucket,
            cache,
            breaker,
            sink,
        }
    }

    /// The configuration this envelope was built with.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Execute a non-cacheable operation through the envelope.
    ///
    /// The closure is re-invoked on each retry attempt, so it must be
    /// idempotent from the backing store's point of view (upserts and
    /// deletes are).
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        f: F,
    ) -> Result<T, AdapterError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let started = Instant::now();
        let result = self.run(&f).await;
        self.emit(operation, outcome_of(&result, |_| Outcome::Hit), started, &result);
        result
    }

    /// Execute a read-shaped operation through the envelope.
    ///
    /// Consults the response cache under the given request fingerprint and
    /// caches the result (including clean misses) on success.
    pub async fn execute_cached<F, Fut>(
        &self,
        operation: &'static str,
        fingerprint: &str,
        f: F,
    ) -> Result<Option<Value>, AdapterError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<Value>, AdapterError>>,
    {
        let started = Instant::now();
        // Rate limiting applies before the cache: a cache-hit storm still
        // spends tokens, keeping observed throughput within configuration.
        self.bucket.acquire().await;

        if let Some(cached) = self.cache.get(fingerprint) {
            let outcome = if cached.is_some() {
                Outcome::Hit
            } else {
                Outcome::Miss
            };
            self.record(operation, outcome, started, None);
            return Ok(cached);
        }

        let result = self.run_attempts(&f).await;
        if let Ok(value) = &result {
            self.cache.put(fingerprint.to_owned(), value.clone());
        }
        let classify = |value: &Option<Value>| {
            if value.is_some() {
                Outcome::Hit
            } else {
                Outcome::Miss
            }
        };
        self.emit(operation, outcome_of(&result, classify), started, &result);
        result
    }

    /// Drop all cached responses.
    ///
    /// Called by adapters after a successful mutation so a write is never
    /// shadowed by this adapter's own de-duplication cache.
    pub fn invalidate_responses(&self) {
        self.cache.clear();
    }

    /// Current breaker state.
    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Snapshot of the envelope's internal state.
    pub fn snapshot(&self) -> EnvelopeSnapshot {
        EnvelopeSnapshot {
            tier: self.tier,
            breaker: self.breaker.state(),
            available_tokens: self.bucket.available(),
            cached_responses: self.cache.len(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
        }
    }

    /// Rate limit, then run the attempt loop.
    async fn run<T, F, Fut>(&self, f: &F) -> Result<T, AdapterError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        self.bucket.acquire().await;
        self.run_attempts(f).await
    }

    /// Timeout, retry, and circuit-breaker accounting for one logical call.
    async fn run_attempts<T, F, Fut>(&self, f: &F) -> Result<T, AdapterError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AdapterError>>,
    {
        let loop_started = Instant::now();
        let budget = self.config.retry_budget();
        let mut attempt: u32 = 0;

        loop {
            // While Open, rejection is purely local: no attempt reaches the
            // backing store at all.
            self.breaker.try_acquire()?;

            let attempt_result = match tokio::time::timeout(self.config.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(AdapterError::Timeout {
                    elapsed: self.config.timeout,
                }),
            };

            let err = match attempt_result {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                // Caller bugs (schema/permission) surface immediately and
                // do not trip the breaker.
                return Err(err);
            }
            self.breaker.record_failure();

            attempt += 1;
            if attempt > self.config.retries {
                return Err(err);
            }
            let delay = self.backoff_delay(attempt);
            if loop_started.elapsed() + delay >= budget {
                return Err(err);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Exponential backoff with up to 25% jitter, capped at `max_delay`.
    fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self.config.base_delay.as_secs_f64() * f64::from(1u32 << exp);
        let capped = base.min(self.config.max_delay.as_secs_f64());
        let jittered = capped * (1.0 + rand::random::<f64>() * 0.25);
        std::time::Duration::from_secs_f64(jittered)
    }

    fn emit<T>(
        &self,
        operation: &'static str,
        outcome: Outcome,
        started: Instant,
        result: &Result<T, AdapterError>,
    ) {
        let error_kind = result.as_ref().err().map(AdapterError::kind_label);
        self.record(operation, outcome, started, error_kind);
    }

    fn record(
        &self,
        operation: &'static str,
        outcome: Outcome,
        started: Instant,
        error_kind: Option<&'static str>,
    ) {
        self.sink.record(&CallRecord {
            tier: self.tier,
            operation,
            outcome,
            duration: started.elapsed(),
            error_kind,
            at: chrono::Utc::now(),
        });
    }
}

fn outcome_of<T>(
    result: &Result<T, AdapterError>,
    classify: impl Fn(&T) -> Outcome,
) -> Outcome {
    match result {
        Ok(value) => classify(value),
        Err(_) => Outcome::Error,
    }
}
