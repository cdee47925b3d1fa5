//! In-memory backend: the test double and single-process default.
//!
//! Honors TTL as an eviction deadline checked lazily at read time, supports
//! document queries and prefix listing, and exposes eviction helpers so
//! tests can simulate hot-tier churn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use strata_core::{AdapterError, Key, QueryFilter, Value};

use crate::TierBackend;

struct StoredItem {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredItem {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// In-memory tier backend.
#[derive(Default)]
pub struct MemoryBackend {
    items: RwLock<HashMap<Key, StoredItem>>,
    connected: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `connect` has been called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of unexpired entries.
    pub fn len(&self) -> usize {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.values().filter(|item| !item.is_expired()).count()
    }

    /// Whether the backend holds no unexpired entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a key immediately, simulating store-side eviction.
    pub fn evict(&self, key: &Key) -> bool {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[async_trait]
impl TierBackend for MemoryBackend {
    async fn connect(&self) -> Result<(), AdapterError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &Key) -> Result<Option<Value>, AdapterError> {
        {
            let items = self.items.read().unwrap_or_else(|e| e.into_inner());
            match items.get(key) {
                Some(item) if !item.is_expired() => return Ok(Some(item.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired entry: remove lazily and report a miss.
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(None)
    }

    async fn put(
        &self,
        key: &Key,
        value: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), AdapterError> {
        let item = StoredItem {
            value: value.clone(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), item);
        Ok(())
    }

    async fn remove(&self, key: &Key) -> Result<bool, AdapterError> {
        let removed = self
            .items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(removed.is_some_and(|item| !item.is_expired()))
    }

    async fn query(&self, filter: &QueryFilter) -> Result<Vec<Value>, AdapterError> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items
            .values()
            .filter(|item| !item.is_expired() && filter.matches(&item.value))
            .map(|item| item.value.clone())
            .collect())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Key>, AdapterError> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items
            .iter()
            .filter(|(key, item)| !item.is_expired() && key.has_prefix(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn ttl_expiry_is_honored_at_read() {
        let backend = MemoryBackend::new();
        let key = Key::new("session:1");
        backend
            .put(&key, &Value::text("v"), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        assert!(backend.get(&key).await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.get(&key).await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn remove_reports_whether_something_was_there() {
        let backend = MemoryBackend::new();
        let key = Key::new("k");
        backend.put(&key, &Value::text("v"), None).await.unwrap();
        assert!(backend.remove(&key).await.unwrap());
        assert!(!backend.remove(&key).await.unwrap());
    }

    #[tokio::test]
    async fn query_skips_expired_and_non_matching() {
        let backend = MemoryBackend::new();
        backend
            .put(
                &Key::new("a"),
                &Value::document(json!({"segment": "vip"})),
                None,
            )
            .await
            .unwrap();
        backend
            .put(
                &Key::new("b"),
                &Value::document(json!({"segment": "vip"})),
                Some(Duration::from_millis(10)),
            )
            .await
            .unwrap();
        backend
            .put(&Key::new("c"), &Value::text("vip"), None)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let matches = backend
            .query(&QueryFilter::field_equals("segment", json!("vip")))
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn evict_simulates_store_side_churn() {
        let backend = MemoryBackend::new();
        let key = Key::new("hot:1");
        backend.put(&key, &Value::text("v"), None).await.unwrap();
        assert!(backend.evict(&key));
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }
}
