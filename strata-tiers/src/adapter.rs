//! Envelope-wrapped tier adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use strata_core::{AdapterError, Key, QueryFilter, ResilienceConfig, TelemetrySink, Tier, Value};
use strata_resilience::{EnvelopeSnapshot, ResilienceEnvelope};

use crate::{TierBackend, TierStore};

/// One tier's adapter: a backend plus its own resilience envelope.
///
/// Constructed once per process with its resilience configuration; the
/// envelope's rate-limiter, response-cache, and breaker state are private to
/// this instance, so an outage in one tier never degrades another.
pub struct TierAdapter<B: TierBackend> {
    tier: Tier,
    backend: Arc<B>,
    envelope: ResilienceEnvelope,
}

impl<B: TierBackend> TierAdapter<B> {
    /// Create an adapter for the given tier.
    pub fn new(
        tier: Tier,
        backend: B,
        config: ResilienceConfig,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            tier,
            backend: Arc::new(backend),
            envelope: ResilienceEnvelope::new(tier, config, sink),
        }
    }

    /// Hot-tier adapter with the hot resilience preset.
    pub fn hot(backend: B, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::new(Tier::Hot, backend, ResilienceConfig::hot(), sink)
    }

    /// Warm-tier adapter with the warm resilience preset.
    pub fn warm(backend: B, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::new(Tier::Warm, backend, ResilienceConfig::warm(), sink)
    }

    /// Cold-tier adapter with the cold resilience preset.
    pub fn cold(backend: B, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::new(Tier::Cold, backend, ResilienceConfig::cold(), sink)
    }

    /// The underlying backend handle.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Health snapshot of this adapter's envelope.
    pub fn snapshot(&self) -> EnvelopeSnapshot {
        self.envelope.snapshot()
    }

    fn fetch_fingerprint(key: &Key) -> String {
        format!("fetch:{key}")
    }
}

#[async_trait]
impl<B: TierBackend + 'static> TierStore for TierAdapter<B> {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        let backend = Arc::clone(&self.backend);
        self.envelope
            .execute("connect", move || {
                let backend = Arc::clone(&backend);
                async move { backend.connect().await }
            })
            .await
    }

    async fn fetch(&self, key: &Key) -> Result<Option<Value>, AdapterError> {
        let backend = Arc::clone(&self.backend);
        let key = key.clone();
        self.envelope
            .execute_cached("fetch", &Self::fetch_fingerprint(&key), move || {
                let backend = Arc::clone(&backend);
                let key = key.clone();
                async move { backend.get(&key).await }
            })
            .await
    }

    async fn upsert(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError> {
        let backend = Arc::clone(&self.backend);
        let key = key.clone();
        let value = value.clone();
        let result = self
            .envelope
            .execute("upsert", move || {
                let backend = Arc::clone(&backend);
                let key = key.clone();
                let value = value.clone();
                async move { backend.put(&key, &value, ttl).await }
            })
            .await;
        if result.is_ok() {
            self.envelope.invalidate_responses();
        }
        result
    }

    async fn delete(&self, key: &Key) -> Result<bool, AdapterError> {
        let backend = Arc::clone(&self.backend);
        let key = key.clone();
        let result = self
            .envelope
            .execute("delete", move || {
                let backend = Arc::clone(&backend);
                let key = key.clone();
                async move { backend.remove(&key).await }
            })
            .await;
        if result.is_ok() {
            self.envelope.invalidate_responses();
        }
        result
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<Value>, AdapterError> {
        let backend = Arc::clone(&self.backend);
        let filter = filter.clone();
        self.envelope
            .execute("query", move || {
                let backend = Arc::clone(&backend);
                let filter = filter.clone();
                async move { backend.query(&filter).await }
            })
            .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Key>, AdapterError> {
        let backend = Arc::clone(&self.backend);
        let prefix = prefix.to_owned();
        self.envelope
            .execute("list", move || {
                let backend = Arc::clone(&backend);
                let prefix = prefix.clone();
                async move { backend.list(&prefix).await }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use serde_json::json;
    use strata_core::NullSink;

    fn test_config() -> ResilienceConfig {
        ResilienceConfig::default()
            .with_timeout(Duration::from_millis(200))
            .with_rate(1000, 1.0)
    }

    fn adapter(tier: Tier) -> TierAdapter<MemoryBackend> {
        TierAdapter::new(tier, MemoryBackend::new(), test_config(), Arc::new(NullSink))
    }

    #[tokio::test]
    async fn round_trip_through_the_envelope() {
        let store = adapter(Tier::Warm);
        store.connect().await.unwrap();

        let key = Key::new("profile:1");
        let value = Value::document(json!({"name": "Ann"}));
        store.upsert(&key, &value, None).await.unwrap();

        assert_eq!(store.fetch(&key).await.unwrap(), Some(value));
        assert_eq!(store.fetch(&Key::new("profile:2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = adapter(Tier::Hot);
        let key = Key::new("session:9");
        store
            .upsert(&key, &Value::text("token"), None)
            .await
            .unwrap();

        assert!(store.delete(&key).await.unwrap());
        // Deleting a non-existent key is success with "nothing removed".
        assert_eq!(store.delete(&key).await, Ok(false));
    }

    #[tokio::test]
    async fn upsert_invalidates_the_response_cache() {
        let store = adapter(Tier::Hot);
        let key = Key::new("k");
        store.upsert(&key, &Value::text("v1"), None).await.unwrap();
        assert_eq!(
            store.fetch(&key).await.unwrap(),
            Some(Value::text("v1"))
        );

        // Without invalidation this read would be served the stale v1 from
        // the envelope's de-duplication cache.
        store.upsert(&key, &Value::text("v2"), None).await.unwrap();
        assert_eq!(
            store.fetch(&key).await.unwrap(),
            Some(Value::text("v2"))
        );
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let store = adapter(Tier::Cold);
        store.connect().await.unwrap();
        store.connect().await.unwrap();
    }

    #[tokio::test]
    async fn query_and_list_pass_through() {
        let store = adapter(Tier::Warm);
        store
            .upsert(
                &Key::new("profile:1"),
                &Value::document(json!({"segment": "vip"})),
                None,
            )
            .await
            .unwrap();
        store
            .upsert(
                &Key::new("profile:2"),
                &Value::document(json!({"segment": "bulk"})),
                None,
            )
            .await
            .unwrap();

        let matches = store
            .query(&QueryFilter::field_equals("segment", json!("vip")))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);

        let mut keys = store.list("profile:").await.unwrap();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(keys, vec![Key::new("profile:1"), Key::new("profile:2")]);
    }
}
