//! Concurrency limiter
//!
//! Semaphore with a fixed number of permits that caps how many ficha requests
//! are in flight at once.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Maximum number of requests in flight
    pub max_concurrent_requests: usize,
}

impl ConcurrencyConfig {
    pub fn new(max_concurrent_requests: usize) -> Self {
        Self {
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }
}

/// Semaphore-based limiter shared by every request of one batch
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
    requests_acquired: Arc<AtomicU64>,
    requests_waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    pub fn new(config: ConcurrencyConfig) -> Self {
        let config = ConcurrencyConfig::new(config.max_concurrent_requests);
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            config,
            requests_acquired: Arc::new(AtomicU64::new(0)),
            requests_waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Limiter with `workers` permits
    pub fn with_workers(workers: usize) -> Self {
        Self::new(ConcurrencyConfig::new(workers))
    }

    /// Acquire a permit, waiting while all are in use.
    /// The permit is released when dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        if self.semaphore.available_permits() == 0 {
            self.requests_waited.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Concurrency limiter: waiting for permit ({} in use)",
                self.config.max_concurrent_requests
            );
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");
        self.requests_acquired.fetch_add(1, Ordering::Relaxed);
        permit
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.config.max_concurrent_requests
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            available_permits: self.available_permits(),
            max_concurrent_requests: self.config.max_concurrent_requests,
            requests_acquired: self.requests_acquired.load(Ordering::Relaxed),
            requests_waited: self.requests_waited.load(Ordering::Relaxed),
        }
    }
}

/// Counters collected over a limiter's lifetime
#[derive(Debug, Clone)]
pub struct ConcurrencyStats {
    pub available_permits: usize,
    pub max_concurrent_requests: usize,
    /// Total permits handed out
    pub requests_acquired: u64,
    /// Requests that found every permit taken
    pub requests_waited: u64,
}

impl ConcurrencyStats {
    /// Share of requests that had to wait for a permit
    pub fn wait_rate(&self) -> f64 {
        if self.requests_acquired == 0 {
            0.0
        } else {
            self.requests_waited as f64 / self.requests_acquired as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_max_permits() {
        let limiter = ConcurrencyLimiter::with_workers(3);

        let _p1 = limiter.acquire().await;
        let _p2 = limiter.acquire().await;
        let _p3 = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        let blocked = tokio::time::timeout(
            tokio::time::Duration::from_millis(20),
            limiter.acquire(),
        )
        .await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_limiter_release() {
        let limiter = ConcurrencyLimiter::with_workers(2);

        let p1 = limiter.acquire().await;
        let _p2 = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        drop(p1);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_limiter_acquire_waits() {
        let limiter = ConcurrencyLimiter::with_workers(1);
        let limiter_clone = limiter.clone();

        let permit = limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        let handle = tokio::spawn(async move {
            let _permit = limiter_clone.acquire().await;
            true
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        drop(permit);

        let result = tokio::time::timeout(tokio::time::Duration::from_millis(100), handle).await;
        assert!(result.is_ok());
        assert_eq!(limiter.stats().requests_waited, 1);
    }

    #[tokio::test]
    async fn test_limiter_stats() {
        let limiter = ConcurrencyLimiter::with_workers(3);

        let _p1 = limiter.acquire().await;
        let _p2 = limiter.acquire().await;

        let stats = limiter.stats();
        assert_eq!(stats.max_concurrent_requests, 3);
        assert_eq!(stats.available_permits, 1);
        assert_eq!(stats.requests_acquired, 2);
        assert_eq!(stats.wait_rate(), 0.0);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let limiter = ConcurrencyLimiter::with_workers(0);
        assert_eq!(limiter.max_concurrent_requests(), 1);
    }
}
