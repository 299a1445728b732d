//! Retry policy for calls to the backing store.
//!
//! The policy belongs to the transport client; the cache and the
//! read-through layer never retry on their own.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::FetchError;

/// Default number of attempts per call.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt; doubles after each failure.
const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Default bound on a single attempt.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Per-attempt limit; an attempt running longer fails with `Timeout`.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the default timeout.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, given `attempt` (1-based) just failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Run `op` under `policy`: each attempt is bounded by the timeout, retryable
/// failures are retried with exponential backoff, anything else is returned
/// immediately.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(format!(
                "no response within {}s",
                policy.timeout.as_secs_f32()
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = fast_policy(5);
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures_until_success() {
        let calls = &AtomicU32::new(0);

        let result = retry(&fast_policy(3), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(FetchError::network("connection reset"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(2), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::new(FetchErrorKind::Server, "503"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, FetchErrorKind::Server);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::new(FetchErrorKind::Unauthorized, "bad key"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, FetchErrorKind::Unauthorized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempt_times_out() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(2), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap_err().kind, FetchErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_none_policy_makes_single_attempt() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = retry(&RetryPolicy::none(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::network("offline"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
