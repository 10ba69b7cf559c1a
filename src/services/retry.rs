//! Exponential backoff with jitter for transient substrate errors (§7).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::domain::errors::SubstrateError;

/// Retry policy for a single unit of work against an external capability.
///
/// A hand-rolled exponential-backoff idiom: backoff doubles from
/// `initial_backoff_ms`, capped at `max_backoff_ms`, with up to
/// `max_retries` retries after the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self { max_retries, initial_backoff_ms, max_backoff_ms }
    }

    /// Executes `operation`, retrying on `SubstrateError::is_transient()`
    /// with jittered exponential backoff. Permanent errors return
    /// immediately on the first attempt.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, SubstrateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SubstrateError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_transient() || attempt >= self.max_retries {
                        return Err(err);
                    }
                    let backoff = self.jittered_backoff(attempt);
                    tracing::warn!(attempt, backoff_ms = backoff.as_millis() as u64, error = %err, "retrying after transient substrate error");
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        let jitter_ms = rand::rng().random_range(0..=(base_ms / 4).max(1));
        Duration::from_millis(base_ms + jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_ok() {
        let policy = RetryPolicy::new(3, 1, 2);
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let result = policy.execute(|| { let c = c.clone(); async move { c.fetch_add(1, Ordering::SeqCst); Ok::<_, SubstrateError>(42) } }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, 1, 2);
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let result = policy
            .execute(|| {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(SubstrateError::Transient("rate limited".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let policy = RetryPolicy::new(3, 1, 2);
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let result: Result<i32, _> = policy
            .execute(|| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(SubstrateError::Permanent("bad key".into()))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let policy = RetryPolicy::new(2, 1, 2);
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let result: Result<i32, _> = policy
            .execute(|| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(SubstrateError::Transient("still failing".into()))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
