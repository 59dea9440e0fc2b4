//! In-memory response cache with insertion-order eviction and a fixed TTL
//!
//! Entries are keyed by request path and hold the raw upstream JSON. Expired
//! entries are dropped lazily when they are looked up, or in bulk through
//! [`ResponseCache::purge_expired`].

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// A single cached upstream payload
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Request key the payload was stored under
    pub key: String,
    /// Raw JSON payload
    pub payload: Value,
    /// When the payload was stored
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

/// Bounded FIFO cache of upstream responses
///
/// Once `capacity` entries are held, inserting a new key evicts the entry that
/// was inserted earliest, regardless of how recently it was read.
#[derive(Debug)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Creates an empty cache
    ///
    /// A capacity of zero is bumped to one so `put` always retains the latest entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Returns the payload stored under `key` if it is younger than the TTL
    ///
    /// A stale entry is removed and reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let expired = self.entries.get(key)?.is_expired(now, self.ttl);

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.payload.clone())
    }

    /// Stores `payload` under `key`
    ///
    /// Re-storing an existing key replaces it and moves it to the newest position.
    pub fn put(&mut self, key: impl Into<String>, payload: Value) {
        let key = key.into();

        if self.entries.contains_key(&key) {
            self.remove(&key);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops every entry whose age has reached the TTL, returning how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();

        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));

        before - self.entries.len()
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of entries currently held, including ones not yet found stale
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is held, without checking freshness
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}
