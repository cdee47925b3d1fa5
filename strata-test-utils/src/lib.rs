//! STRATA Test Utils - Failure Injection for Tier Tests
//!
//! [`FlakyBackend`] wraps a [`MemoryBackend`] and injects scripted failures,
//! artificial latency, and per-operation call counting, so resilience and
//! cascade behavior can be exercised deterministically without a real
//! backing store.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use strata_core::{AdapterError, Key, QueryFilter, Value};
use strata_tiers::{MemoryBackend, TierBackend};

pub mod fixtures;

/// A memory backend with scripted misbehavior.
///
/// Failure precedence per call: latency is applied first, then a standing
/// outage (`set_unavailable`), then any remaining one-shot failures
/// (`fail_next`). Calls are counted whether or not they fail.
pub struct FlakyBackend {
    inner: MemoryBackend,
    unavailable: AtomicBool,
    rejecting: AtomicBool,
    failures_remaining: AtomicU32,
    latency_ms: AtomicU64,
    get_calls: AtomicU32,
    put_calls: AtomicU32,
    remove_calls: AtomicU32,
    connect_calls: AtomicU32,
}

impl Default for FlakyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            unavailable: AtomicBool::new(false),
            rejecting: AtomicBool::new(false),
            failures_remaining: AtomicU32::new(0),
            latency_ms: AtomicU64::new(0),
            get_calls: AtomicU32::new(0),
            put_calls: AtomicU32::new(0),
            remove_calls: AtomicU32::new(0),
            connect_calls: AtomicU32::new(0),
        }
    }

    /// The wrapped store, for seeding and direct inspection.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Toggle a standing outage: every call fails transiently until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Toggle schema rejections: every call fails non-retryably until
    /// cleared, as a store rejecting malformed requests would.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Fail the next `n` calls (across all operations) transiently, then
    /// behave normally again.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Delay every call by the given duration. Zero disables.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> u32 {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    async fn misbehave(&self) -> Result<(), AdapterError> {
        let latency_ms = self.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdapterError::transient("injected outage"));
        }
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(AdapterError::schema("injected rejection"));
        }
        // Consume one scripted failure if any remain.
        let take = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if take.is_ok() {
            return Err(AdapterError::transient("injected one-shot failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TierBackend for FlakyBackend {
    async fn connect(&self) -> Result<(), AdapterError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.misbehave().await?;
        self.inner.connect().await
    }

    async fn get(&self, key: &Key) -> Result<Option<Value>, AdapterError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.misbehave().await?;
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.misbehave().await?;
        self.inner.put(key, value, ttl).await
    }

    async fn remove(&self, key: &Key) -> Result<bool, AdapterError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.misbehave().await?;
        self.inner.remove(key).await
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<Value>, AdapterError> {
        self.misbehave().await?;
        self.inner.query(filter).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Key>, AdapterError> {
        self.misbehave().await?;
        self.inner.list(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_shot_failures_are_consumed_in_order() {
        let backend = FlakyBackend::new();
        let key = Key::new("k");
        backend.inner().put(&key, &Value::text("v"), None).await.unwrap();

        backend.fail_next(2);
        assert!(backend.get(&key).await.is_err());
        assert!(backend.get(&key).await.is_err());
        assert_eq!(backend.get(&key).await.unwrap(), Some(Value::text("v")));
        assert_eq!(backend.get_calls(), 3);
    }

    #[tokio::test]
    async fn standing_outage_until_cleared() {
        let backend = FlakyBackend::new();
        backend.set_unavailable(true);
        assert!(backend.connect().await.is_err());
        backend.set_unavailable(false);
        assert!(backend.connect().await.is_ok());
        assert_eq!(backend.connect_calls(), 2);
    }
}
