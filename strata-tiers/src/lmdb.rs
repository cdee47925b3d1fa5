//! LMDB-backed hot-tier backend.
//!
//! Memory-mapped key-value storage via the heed crate, suitable for the
//! sub-50ms hot tier when a single-process persistent cache is wanted. TTL
//! is stored alongside the value and enforced lazily at read time.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use heed::types::{SerdeJson, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};

use strata_core::{AdapterError, Key, QueryFilter, Value};

use crate::TierBackend;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: Value,
    /// Eviction deadline as Unix milliseconds; `None` means no TTL.
    expires_at_ms: Option<i64>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        self.expires_at_ms
            .is_some_and(|at| at <= chrono::Utc::now().timestamp_millis())
    }
}

/// LMDB tier backend.
///
/// One environment handle per backend instance, reused across all calls.
/// Reads use read transactions; writes use short write transactions, as in
/// any LMDB deployment.
pub struct LmdbBackend {
    env: Env,
    db: Database<Str, SerdeJson<StoredEntry>>,
}

impl LmdbBackend {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: impl AsRef<Path>, max_size_mb: usize) -> Result<Self, AdapterError> {
        std::fs::create_dir_all(path.as_ref())
            .map_err(|e| AdapterError::transient(format!("lmdb dir: {e}")))?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
                .map_err(|e| AdapterError::transient(format!("lmdb open: {e}")))?
        };

        let mut wtxn = env.write_txn().map_err(Self::store_err)?;
        let db = env
            .create_database(&mut wtxn, Some("items"))
            .map_err(Self::store_err)?;
        wtxn.commit().map_err(Self::store_err)?;

        Ok(Self { env, db })
    }

    fn store_err(e: heed::Error) -> AdapterError {
        AdapterError::transient(format!("lmdb: {e}"))
    }

    fn remove_sync(&self, key: &Key) -> Result<bool, AdapterError> {
        let mut wtxn = self.env.write_txn().map_err(Self::store_err)?;
        let removed = self
            .db
            .delete(&mut wtxn, key.as_str())
            .map_err(Self::store_err)?;
        wtxn.commit().map_err(Self::store_err)?;
        Ok(removed)
    }
}

#[async_trait]
impl TierBackend for LmdbBackend {
    async fn connect(&self) -> Result<(), AdapterError> {
        // The environment is opened at construction; validate it with a
        // cheap read transaction so reconnects after a recovered circuit
        // are meaningful probes.
        let rtxn = self.env.read_txn().map_err(Self::store_err)?;
        drop(rtxn);
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Option<Value>, AdapterError> {
        let expired = {
            let rtxn = self.env.read_txn().map_err(Self::store_err)?;
            match self.db.get(&rtxn, key.as_str()).map_err(Self::store_err)? {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value)),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.remove_sync(key)?;
        }
        Ok(None)
    }

    async fn put(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError> {
        let entry = StoredEntry {
            value: value.clone(),
            expires_at_ms: ttl
                .map(|ttl| chrono::Utc::now().timestamp_millis() + ttl.as_millis() as i64),
        };
        let mut wtxn = self.env.write_txn().map_err(Self::store_err)?;
        self.db
            .put(&mut wtxn, key.as_str(), &entry)
            .map_err(Self::store_err)?;
        wtxn.commit().map_err(Self::store_err)
    }

    async fn remove(&self, key: &Key) -> Result<bool, AdapterError> {
        self.remove_sync(key)
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<Value>, AdapterError> {
        let rtxn = self.env.read_txn().map_err(Self::store_err)?;
        let mut matches = Vec::new();
        for item in self.db.iter(&rtxn).map_err(Self::store_err)? {
            let (_, entry) = item.map_err(Self::store_err)?;
            if !entry.is_expired() && filter.matches(&entry.value) {
                matches.push(entry.value);
            }
        }
        Ok(matches)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Key>, AdapterError> {
        let rtxn = self.env.read_txn().map_err(Self::store_err)?;
        let mut keys = Vec::new();
        for item in self
            .db
            .prefix_iter(&rtxn, prefix)
            .map_err(Self::store_err)?
        {
            let (key, entry) = item.map_err(Self::store_err)?;
            if !entry.is_expired() {
                keys.push(Key::new(key));
            }
        }
        Ok(keys)
    }
}
