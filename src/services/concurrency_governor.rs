//! Process-wide concurrency governor (§4.6, §5).
//!
//! A `tokio::sync::Semaphore` wrapped in an owning type rather than a
//! bare `Arc<Semaphore>`, so permit acquisition is cancellation-aware
//! (selects against the mission's `CancellationToken`) and instrumented.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::errors::MissionError;

/// Bounds concurrent LLM/search calls to `max_concurrent_requests` (§4.6).
/// The minimum of 10 is enforced at config-validation time
/// (`ResearchConfig::validate`), not here.
pub struct ConcurrencyGovernor {
    semaphore: tokio::sync::Semaphore,
}

pub struct Permit<'a> {
    _inner: tokio::sync::SemaphorePermit<'a>,
}

impl ConcurrencyGovernor {
    pub fn new(max_concurrent_requests: usize) -> Arc<Self> {
        Arc::new(Self { semaphore: tokio::sync::Semaphore::new(max_concurrent_requests) })
    }

    /// Acquires a permit, racing against `cancel`. Returns
    /// `MissionError::Cancelled` if the mission is stopped while waiting
    /// (§5 "every acquisition of the concurrency governor" is a
    /// suspension point that must observe cancellation).
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit<'_>, MissionError> {
        tokio::select! {
            permit = self.semaphore.acquire() => {
                let permit = permit.expect("semaphore is never closed");
                Ok(Permit { _inner: permit })
            }
            () = cancel.cancelled() => Err(MissionError::Cancelled),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_succeeds_when_capacity_available() {
        let governor = ConcurrencyGovernor::new(2);
        let cancel = CancellationToken::new();
        let _permit = governor.acquire(&cancel).await.unwrap();
        assert_eq!(governor.available_permits(), 1);
    }

    #[tokio::test]
    async fn permit_releases_on_drop() {
        let governor = ConcurrencyGovernor::new(1);
        let cancel = CancellationToken::new();
        {
            let _permit = governor.acquire(&cancel).await.unwrap();
            assert_eq!(governor.available_permits(), 0);
        }
        assert_eq!(governor.available_permits(), 1);
    }

    #[tokio::test]
    async fn acquire_returns_cancelled_when_token_fires_first() {
        let governor = ConcurrencyGovernor::new(1);
        let _held = governor.semaphore.acquire().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = governor.acquire(&cancel).await;
        assert!(matches!(result, Err(MissionError::Cancelled)));
    }
}
