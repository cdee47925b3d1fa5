//! STRATA Tiers - Adapter Contract and Backends
//!
//! A [`TierBackend`] speaks one backing store's native protocol (get/put/
//! delete, plus query for document stores and list for blob stores). A
//! [`TierAdapter`] wraps a backend in its own resilience envelope and
//! exposes the uniform [`TierStore`] contract the gateway cascades over.
//!
//! Backends here: [`MemoryBackend`] (the in-memory test double and default)
//! and [`LmdbBackend`] (memory-mapped hot-tier store).

pub mod adapter;
pub mod lmdb;
pub mod memory;

pub use adapter::TierAdapter;
pub use lmdb::LmdbBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use std::time::Duration;

use strata_core::{AdapterError, Key, QueryFilter, Value};

// ============================================================================
// BACKEND PROTOCOL
// ============================================================================

/// Raw protocol contract against one backing store.
///
/// Implementations own exactly one connection/client handle, reused across
/// all calls. They must report timeouts and connection failures
/// distinguishably from not-found (`Ok(None)` / `Ok(false)`), and must make
/// `connect` safe to call repeatedly.
#[async_trait]
pub trait TierBackend: Send + Sync {
    /// Establish or validate the backing connection. Idempotent.
    async fn connect(&self) -> Result<(), AdapterError>;

    /// Point read. `Ok(None)` is a clean miss, never an error.
    async fn get(&self, key: &Key) -> Result<Option<Value>, AdapterError>;

    /// Create or replace a value, with store-specific TTL semantics.
    async fn put(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError>;

    /// Delete a value, reporting whether anything was removed.
    async fn remove(&self, key: &Key) -> Result<bool, AdapterError>;

    /// Field-equality query over structured documents (document stores).
    ///
    /// Stores without structured-query support reject this with a schema
    /// error rather than silently returning nothing.
    async fn query(&self, _filter: &QueryFilter) -> Result<Vec<Value>, AdapterError> {
        Err(AdapterError::schema("backend does not support query"))
    }

    /// Enumerate keys under a prefix (blob stores).
    async fn list(&self, _prefix: &str) -> Result<Vec<Key>, AdapterError> {
        Err(AdapterError::schema("backend does not support list"))
    }
}

// ============================================================================
// TIER STORE CONTRACT
// ============================================================================

/// The uniform adapter contract the gateway and connectors consume.
///
/// Identical shape across tiers; only configuration defaults and payload
/// conventions differ. `query` is meaningful on the warm tier (used by
/// connectors, never by the cascading gateway) and `list` on the cold tier.
#[async_trait]
pub trait TierStore: Send + Sync {
    /// Which tier this store represents.
    fn tier(&self) -> strata_core::Tier;

    /// Establish/validate the backing connection. Idempotent; safe to call
    /// again after a circuit recovers.
    async fn connect(&self) -> Result<(), AdapterError>;

    /// Point read through the envelope (cacheable).
    async fn fetch(&self, key: &Key) -> Result<Option<Value>, AdapterError>;

    /// Write through the envelope (not cacheable).
    async fn upsert(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError>;

    /// Delete through the envelope; `Ok(false)` means nothing was removed.
    async fn delete(&self, key: &Key) -> Result<bool, AdapterError>;

    /// Structured query (warm tier).
    async fn query(&self, filter: &QueryFilter) -> Result<Vec<Value>, AdapterError>;

    /// Prefix listing (cold tier).
    async fn list(&self, prefix: &str) -> Result<Vec<Key>, AdapterError>;
}
