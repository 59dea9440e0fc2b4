//! Minimum spacing between outgoing requests
//!
//! One limiter is shared by every request a client makes. The check is
//! best-effort: the last dispatch time is read, the caller sleeps off the
//! remainder, and only then is the new dispatch recorded. Sequential callers
//! are spaced by at least the interval; callers that check at the same moment
//! may see the same stale timestamp and dispatch together.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between request dispatches
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the minimum interval since the last dispatch has passed, then records a dispatch
    pub async fn wait(&self) {
        let remaining = self
            .last_dispatch()
            .map(|last| self.min_interval.saturating_sub(last.elapsed()))
            .unwrap_or_default();

        if !remaining.is_zero() {
            debug!(wait_ms = remaining.as_millis() as u64, "rate limited");
            tokio::time::sleep(remaining).await;
        }

        self.record_dispatch(Instant::now());
    }

    /// Time of the most recent dispatch
    pub fn last_dispatch(&self) -> Option<Instant> {
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_dispatch(&self, at: Instant) {
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(at);
    }
}
