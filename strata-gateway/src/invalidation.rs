//! Invalidation feed consumer.
//!
//! External systems of record publish change events; this consumer drains
//! them and evicts the affected keys from the fast tiers so the next read
//! falls through to an authoritative copy. Eviction is best-effort: a failed
//! delete is logged and the feed keeps moving, because a stale cache entry
//! will also age out via TTL.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use strata_core::Key;

use crate::TieredGateway;

/// One change notification from a system of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// Key whose fast-tier copies are now suspect.
    pub key: Key,
}

impl Invalidation {
    pub fn new(key: impl Into<Key>) -> Self {
        Self { key: key.into() }
    }
}

/// Background task draining an invalidation channel into the gateway.
///
/// Dropping every sender closes the channel and ends the task; `join` waits
/// for the drain to finish.
pub struct InvalidationConsumer {
    handle: JoinHandle<u64>,
}

impl InvalidationConsumer {
    /// Spawn the consumer over a channel receiver.
    pub fn spawn(gateway: TieredGateway, mut events: mpsc::Receiver<Invalidation>) -> Self {
        let handle = tokio::spawn(async move {
            let mut processed = 0u64;
            while let Some(event) = events.recv().await {
                tracing::debug!(key = %event.key, "invalidation received");
                gateway.invalidate_fast_tiers(&event.key).await;
                processed += 1;
            }
            tracing::debug!(processed, "invalidation feed closed");
            processed
        });
        Self { handle }
    }

    /// Wait for the feed to close, returning how many events were processed.
    pub async fn join(self) -> u64 {
        self.handle.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use strata_core::{NullSink, ResilienceConfig, Tier, Value};
    use strata_tiers::{MemoryBackend, TierAdapter, TierBackend};

    fn adapter(tier: Tier) -> Arc<TierAdapter<MemoryBackend>> {
        let config = ResilienceConfig::default()
            .with_rate(10_000, 1.0)
            .with_response_cache_ttl(Duration::ZERO);
        Arc::new(TierAdapter::new(
            tier,
            MemoryBackend::new(),
            config,
            Arc::new(NullSink),
        ))
    }

    #[tokio::test]
    async fn events_evict_fast_tiers_but_not_cold() {
        let (hot, warm, cold) = (
            adapter(Tier::Hot),
            adapter(Tier::Warm),
            adapter(Tier::Cold),
        );
        let gateway = TieredGateway::new(hot.clone(), warm.clone(), cold.clone());

        let key = Key::new("profile:42");
        for store in [&hot, &warm, &cold] {
            store
                .backend()
                .put(&key, &Value::text("stale"), None)
                .await
                .unwrap();
        }

        let (tx, rx) = mpsc::channel(8);
        let consumer = InvalidationConsumer::spawn(gateway, rx);
        tx.send(Invalidation::new("profile:42")).await.unwrap();
        drop(tx);

        assert_eq!(consumer.join().await, 1);
        assert!(hot.backend().is_empty());
        assert!(warm.backend().is_empty());
        assert_eq!(cold.backend().len(), 1);
    }

    #[tokio::test]
    async fn closing_the_channel_ends_the_task() {
        let gateway = TieredGateway::new(
            adapter(Tier::Hot),
            adapter(Tier::Warm),
            adapter(Tier::Cold),
        );
        let (tx, rx) = mpsc::channel::<Invalidation>(1);
        let consumer = InvalidationConsumer::spawn(gateway, rx);
        drop(tx);
        assert_eq!(consumer.join().await, 0);
    }
}
