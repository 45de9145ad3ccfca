//! Retry wrapper for database operations that may hit transient faults.
//!
//! Call sites pass a closure producing a fresh future per attempt, keeping
//! the retry semantics visible where the operation is invoked.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (0-based): base × 2^attempt.
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run `op`, retrying transient failures with exponential backoff.
///
/// `AlreadyProcessed` propagates immediately — duplicate handling belongs to
/// the caller, not the retry loop. Non-transient errors propagate on first
/// sight. Transient errors retry up to `policy.max_retries` times, then
/// propagate.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err @ StoreError::AlreadyProcessed(_)) => return Err(err),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_secs = delay.as_secs(),
                    error = %err,
                    "Transient database error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if attempt > 0 {
                    error!(attempts = attempt + 1, error = %err, "Database operation failed after retries");
                }
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> StoreError {
        StoreError::Database(sqlx::Error::PoolTimedOut)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(result.is_err());
        // Initial attempt + 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn already_processed_propagates_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::AlreadyProcessed("u".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(StoreError::AlreadyProcessed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_transient_propagates_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Database(sqlx::Error::RowNotFound)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
    }
}
