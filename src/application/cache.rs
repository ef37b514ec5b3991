//! In-process TTL cache.
//!
//! Shared mutable state inside a service process: a map of
//! `key -> (bytes, expiry)` behind a read/write lock. Readers take the
//! shared side; writers, invalidation, and the sweeper take the
//! exclusive side. No I/O ever happens under a guard.
//!
//! Mutating operations on the cached data wipe the whole map, so the
//! very next read observes the post-mutation value. A background sweeper
//! drops expired entries on its own schedule; readers treat expired
//! entries as misses regardless.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

/// Byte-payload TTL cache.
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached bytes, treating expired entries as misses.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.data.clone())
    }

    /// Stores bytes under the key with the configured TTL.
    pub fn put(&self, key: impl Into<String>, data: Vec<u8>) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key.into(),
            CacheEntry {
                data,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops every entry. Called after any mutating operation.
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.clear();
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawns the periodic sweeper task.
    pub fn spawn_sweeper(cache: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let dropped = cache.sweep();
                if dropped > 0 {
                    tracing::debug!(dropped, "cache sweep removed expired entries");
                }
            }
        })
    }
}
