//! Cache module for upstream API responses
//!
//! This module provides a bounded, in-memory response cache with a fixed
//! time-to-live. Entries are evicted in insertion order once the cache is full,
//! and stale entries are never served. An optional background sweeper reclaims
//! expired entries that are not looked up again.

mod memory;
mod sweeper;

pub use memory::{CacheEntry, ResponseCache};
pub use sweeper::SweeperHandle;

use std::sync::{Arc, Mutex, MutexGuard};

/// Cache shared between a client and its sweeper
pub type SharedCache = Arc<Mutex<ResponseCache>>;

/// Locks the shared cache, recovering the guard if a previous holder panicked
///
/// Cache operations never leave the map half-updated, so a poisoned lock is safe to reuse.
pub fn lock_cache(cache: &SharedCache) -> MutexGuard<'_, ResponseCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
