//! Background purge of expired cache entries
//!
//! Stale entries are already skipped on lookup; the sweeper only reclaims the
//! memory held by entries nobody asks for again. The task is owned by a
//! [`SweeperHandle`] and never outlives it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{lock_cache, SharedCache};

/// Handle for the spawned sweep task
///
/// Dropping the handle aborts the task.
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawns a task that purges expired entries from `cache` every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(cache: SharedCache, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first tick (immediate)
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = lock_cache(&cache).purge_expired();
                        if purged > 0 {
                            debug!(purged, "swept expired cache entries");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, task }
    }

    /// Stops the sweep task and waits for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn shared_cache(ttl: Duration) -> SharedCache {
        Arc::new(Mutex::new(ResponseCache::new(16, ttl)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let cache = shared_cache(Duration::from_secs(10));
        lock_cache(&cache).put("a", json!(1));

        let handle = SweeperHandle::spawn(Arc::clone(&cache), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert!(lock_cache(&cache).is_empty());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_leaves_fresh_entries() {
        let cache = shared_cache(Duration::from_secs(600));
        lock_cache(&cache).put("a", json!(1));

        let handle = SweeperHandle::spawn(Arc::clone(&cache), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(lock_cache(&cache).len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let cache = shared_cache(Duration::from_secs(1));
        let handle = SweeperHandle::spawn(cache, Duration::from_millis(5));
        assert!(!handle.is_finished());
        handle.shutdown().await;
    }
}
