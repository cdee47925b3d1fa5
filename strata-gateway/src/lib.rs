//! STRATA Gateway - The Cascading Facade
//!
//! [`TieredGateway`] is the one component with cross-tier policy. Reads
//! cascade hot → warm → cold, promoting hits into faster tiers as detached
//! best-effort tasks; writes target exactly one tier (optionally fanned out
//! write-through); deletes go to all tiers concurrently. The gateway is
//! stateless between calls: every counter, cache, and breaker lives in the
//! adapters' envelopes.
//!
//! ```text
//! caller ── get(key) ──► Hot.fetch ──miss──► Warm.fetch ──miss──► Cold.fetch
//!                          │ hit               │ hit                │ hit
//!                          ▼                   ▼                    ▼
//!                        value          value + promote(Hot)  value + promote(Hot, Warm)
//! ```

pub mod invalidation;

pub use invalidation::{Invalidation, InvalidationConsumer};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use strata_core::{GatewayError, Key, QueryFilter, Tier, Value};
use strata_tiers::TierStore;

/// Cross-tier policy knobs.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// TTL applied when promoting a value into the hot tier.
    pub promotion_hot_ttl: Duration,
    /// TTL applied when promoting a value into the warm tier, if any.
    pub promotion_warm_ttl: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            promotion_hot_ttl: Duration::from_secs(900),
            promotion_warm_ttl: None,
        }
    }
}

/// The facade applications call. Owns no business logic and no state of its
/// own; clones share the underlying adapters.
#[derive(Clone)]
pub struct TieredGateway {
    hot: Arc<dyn TierStore>,
    warm: Arc<dyn TierStore>,
    cold: Arc<dyn TierStore>,
    config: GatewayConfig,
}

impl TieredGateway {
    /// Assemble a gateway over three tier stores.
    pub fn new(
        hot: Arc<dyn TierStore>,
        warm: Arc<dyn TierStore>,
        cold: Arc<dyn TierStore>,
    ) -> Self {
        Self {
            hot,
            warm,
            cold,
            config: GatewayConfig::default(),
        }
    }

    /// Override the cross-tier policy knobs.
    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Connect all three tiers. Per-tier `connect` is idempotent, so this
    /// is safe to call again after a circuit recovers.
    pub async fn connect_all(&self) -> Result<(), GatewayError> {
        for tier in Tier::ALL {
            self.store_for(tier)
                .connect()
                .await
                .map_err(|source| GatewayError::Tier { tier, source })?;
        }
        Ok(())
    }

    /// Cascading read: hot, then warm, then cold.
    ///
    /// Tier errors that merely mean "unavailable" are logged and treated as
    /// miss-equivalent; a value found in a slower tier is returned
    /// immediately and promoted to faster tiers fire-and-forget. A clean
    /// miss everywhere is `Ok(None)`. Non-retryable upstream errors
    /// (schema/permission) propagate without falling through: cascading
    /// covers availability gaps, not caller bugs.
    pub async fn get(&self, key: &Key) -> Result<Option<Value>, GatewayError> {
        self.get_inner(key, None, None).await
    }

    /// [`get`](Self::get) with an overall caller deadline. If the deadline
    /// expires mid-cascade the remaining tier attempts are aborted and the
    /// caller sees `DeadlineExceeded` rather than an ever-longer cascade.
    pub async fn get_with_deadline(
        &self,
        key: &Key,
        deadline: Duration,
    ) -> Result<Option<Value>, GatewayError> {
        self.get_inner(key, Some(Instant::now() + deadline), None)
            .await
    }

    /// [`get`](Self::get) that withholds promotion from values failing the
    /// given check. The value is still returned to the caller.
    ///
    /// Connectors pass their payload-mapping check here so a corrupt record
    /// found in a slow tier is never replicated into faster ones.
    pub async fn get_gated(
        &self,
        key: &Key,
        promotable: impl Fn(&Value) -> bool,
    ) -> Result<Option<Value>, GatewayError> {
        self.get_inner(key, None, Some(&promotable)).await
    }

    async fn get_inner(
        &self,
        key: &Key,
        deadline: Option<Instant>,
        promotable: Option<&dyn Fn(&Value) -> bool>,
    ) -> Result<Option<Value>, GatewayError> {
        let mut any_clean_miss = false;

        for tier in Tier::ALL {
            let store = self.store_for(tier);
            let result = match deadline {
                None => store.fetch(key).await,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(GatewayError::DeadlineExceeded { tier });
                    }
                    match tokio::time::timeout(deadline - now, store.fetch(key)).await {
                        Ok(result) => result,
                        Err(_) => return Err(GatewayError::DeadlineExceeded { tier }),
                    }
                }
            };

            match result {
                Ok(Some(value)) => {
                    if promotable.map_or(true, |check| check(&value)) {
                        self.promote(tier, key, &value);
                    }
                    return Ok(Some(value));
                }
                Ok(None) => {
                    any_clean_miss = true;
                }
                Err(source) if source.is_unavailability() => {
                    tracing::warn!(
                        tier = tier.name(),
                        key = %key,
                        error_kind = source.kind_label(),
                        "tier unavailable during read cascade, falling through"
                    );
                }
                Err(source) => {
                    return Err(GatewayError::Tier { tier, source });
                }
            }
        }

        if any_clean_miss {
            Ok(None)
        } else {
            Err(GatewayError::Unavailable {
                key: key.to_string(),
            })
        }
    }

    /// Write to exactly the requested tier. With `write_through`, fan out
    /// best-effort writes to all faster tiers, fire-and-forget, under the
    /// same discipline as promotion.
    pub async fn set(
        &self,
        key: &Key,
        value: &Value,
        tier: Tier,
        ttl: Option<Duration>,
        write_through: bool,
    ) -> Result<(), GatewayError> {
        // The archival tier keeps everything; a TTL there is a caller
        // misdirection, not an error.
        let ttl = match tier {
            Tier::Cold => {
                if ttl.is_some() {
                    tracing::debug!(key = %key, "cold tier ignores ttl");
                }
                None
            }
            Tier::Hot | Tier::Warm => ttl,
        };
        self.store_for(tier)
            .upsert(key, value, ttl)
            .await
            .map_err(|source| GatewayError::Tier { tier, source })?;

        if write_through {
            self.promote(tier, key, value);
        }
        Ok(())
    }

    /// Delete a key from all three tiers concurrently.
    ///
    /// Succeeds if at least one tier delete succeeded, reporting whether
    /// anything was removed anywhere; per-tier failures are logged, never
    /// raised, unless every tier failed.
    pub async fn delete(&self, key: &Key) -> Result<bool, GatewayError> {
        let deletes = Tier::ALL.map(|tier| {
            let store = self.store_for(tier);
            async move { (tier, store.delete(key).await) }
        });
        let results = join_all(deletes).await;

        let mut any_ok = false;
        let mut removed = false;
        for (tier, result) in results {
            match result {
                Ok(was_removed) => {
                    any_ok = true;
                    removed |= was_removed;
                }
                Err(err) => {
                    tracing::warn!(
                        tier = tier.name(),
                        key = %key,
                        error_kind = err.kind_label(),
                        "tier delete failed"
                    );
                }
            }
        }

        if any_ok {
            Ok(removed)
        } else {
            Err(GatewayError::Unavailable {
                key: key.to_string(),
            })
        }
    }

    /// Field-equality query against the warm tier's document store.
    ///
    /// Queries do not cascade: only the warm tier holds structured
    /// documents, and a query answered from a partial hot cache would be
    /// silently incomplete.
    pub async fn query_warm(&self, filter: &QueryFilter) -> Result<Vec<Value>, GatewayError> {
        self.warm.query(filter).await.map_err(|source| GatewayError::Tier {
            tier: Tier::Warm,
            source,
        })
    }

    /// Enumerate cold-tier keys under a prefix.
    pub async fn list_cold(&self, prefix: &str) -> Result<Vec<Key>, GatewayError> {
        self.cold.list(prefix).await.map_err(|source| GatewayError::Tier {
            tier: Tier::Cold,
            source,
        })
    }

    /// Best-effort eviction of fast-tier copies, used by the invalidation
    /// consumer. The cold/archival copy is left alone.
    pub async fn invalidate_fast_tiers(&self, key: &Key) {
        for tier in [Tier::Hot, Tier::Warm] {
            if let Err(err) = self.store_for(tier).delete(key).await {
                tracing::warn!(
                    tier = tier.name(),
                    key = %key,
                    error_kind = err.kind_label(),
                    "invalidation delete failed"
                );
            }
        }
    }

    /// Spawn detached best-effort writes of `value` into every tier faster
    /// than `found_in`. Never joined by the caller: failure to promote is
    /// logged, not raised, and promotion never delays the read path.
    fn promote(&self, found_in: Tier, key: &Key, value: &Value) {
        for &tier in found_in.faster_tiers() {
            let store = Arc::clone(self.store_for(tier));
            let key = key.clone();
            let value = value.clone();
            let ttl = self.promotion_ttl(tier);
            tokio::spawn(async move {
                if let Err(err) = store.upsert(&key, &value, ttl).await {
                    tracing::warn!(
                        tier = tier.name(),
                        key = %key,
                        error_kind = err.kind_label(),
                        "promotion failed"
                    );
                }
            });
        }
    }

    fn promotion_ttl(&self, tier: Tier) -> Option<Duration> {
        match tier {
            Tier::Hot => Some(self.config.promotion_hot_ttl),
            Tier::Warm => self.config.promotion_warm_ttl,
            Tier::Cold => None,
        }
    }

    fn store_for(&self, tier: Tier) -> &Arc<dyn TierStore> {
        match tier {
            Tier::Hot => &self.hot,
            Tier::Warm => &self.warm,
            Tier::Cold => &self.cold,
        }
    }
}
