//! LRU/TTL response cache for read-shaped operations.
//!
//! This is a de-duplication cache keyed by request fingerprint, sitting
//! inside the resilience envelope. Its TTL is seconds, far shorter than the
//! domain TTLs the tiers themselves enforce. It stores fetch results
//! (`Option<Value>`), so a recent clean miss is de-duplicated too.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use strata_core::Value;

struct Entry {
    value: Option<Value>,
    expires_at: Instant,
    last_used: u64,
}

/// Fingerprint-keyed response cache with TTL expiry and LRU eviction.
pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry>>,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given entry TTL and capacity.
    ///
    /// A zero TTL or zero capacity disables caching entirely.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero() && self.capacity > 0
    }

    /// Look up an unexpired cached response.
    ///
    /// The outer `Option` is cache presence; the inner `Option<Value>` is
    /// the cached fetch result itself.
    pub fn get(&self, fingerprint: &str) -> Option<Option<Value>> {
        if !self.enabled() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(fingerprint) {
            Some(entry) if entry.expires_at > Instant::now() => {
                entry.last_used = self.tick.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(fingerprint);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cache a fetch result, evicting the least-recently-used entry on
    /// overflow.
    pub fn put(&self, fingerprint: String, value: Option<Value>) {
        if !self.enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
            last_used: self.tick.fetch_add(1, Ordering::Relaxed),
        };
        entries.insert(fingerprint, entry);
        if entries.len() > self.capacity {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
    }

    /// Drop every cached response. Called after mutations through the same
    /// adapter so a write is never shadowed by its own adapter's cache.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifetime hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lifetime miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
