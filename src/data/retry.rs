//! Retry orchestration with per-attempt timeouts and capped exponential backoff

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::{ApiError, RateLimiter};

/// How many times to try a request and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Timeout applied to each attempt on its own
    pub attempt_timeout: Duration,
    /// Delay unit for the backoff
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn single(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            ..Default::default()
        }
    }

    /// Delay after the failed attempt numbered `attempt` (1-based): `min(base * 2^attempt, max)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or attempts run out
    ///
    /// Every attempt first waits on `limiter`, then gets its own timeout. The
    /// closure receives the 1-based attempt number. When all attempts fail the
    /// last error is returned.
    pub async fn execute<T, F, Fut>(&self, limiter: &RateLimiter, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            limiter.wait().await;

            let result = match tokio::time::timeout(self.attempt_timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout(self.attempt_timeout)),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            warn!(attempt, max_attempts, error = %err, "request attempt failed");

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.backoff_delay(attempt);
            warn!(delay_ms = delay.as_millis() as u64, "retrying after backoff");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn no_limit() -> RateLimiter {
        RateLimiter::new(Duration::ZERO)
    }

    #[test]
    fn test_backoff_delays_are_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(8000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(8000));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(8000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(&no_limit(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ApiError::status(503, "busy"))
                    } else {
                        Ok("payload")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_last_error() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = policy
            .execute(&no_limit(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(ApiError::status(500 + attempt as u16, "fail")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ApiError::Status { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected last status error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let _: Result<(), ApiError> = policy
            .execute(&no_limit(), |_| async {
                Err(ApiError::status(500, "fail"))
            })
            .await;

        // 2s after attempt 1, 4s after attempt 2, nothing after the last
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = policy
            .execute(&no_limit(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Malformed("no data".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out_and_is_retried() {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let result = policy
            .execute(&no_limit(), |attempt| async move {
                if attempt == 1 {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                Ok(attempt)
            })
            .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_timing_out_returns_timeout() {
        let policy = RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(1),
            ..Default::default()
        };

        let result: Result<(), ApiError> = policy
            .execute(&no_limit(), |_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_waits_on_limiter() {
        let policy = RetryPolicy {
            base_delay: Duration::ZERO,
            ..Default::default()
        };
        let limiter = RateLimiter::new(Duration::from_millis(250));
        let start = Instant::now();

        let _: Result<(), ApiError> = policy
            .execute(&limiter, |_| async { Err(ApiError::status(500, "fail")) })
            .await;

        // Three dispatches, the second and third spaced by the limiter
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy() {
        let policy = RetryPolicy::single(Duration::from_secs(5));
        let calls = AtomicU32::new(0);

        let _: Result<(), ApiError> = policy
            .execute(&no_limit(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::status(500, "fail")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
