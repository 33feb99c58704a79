use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::time::{sleep, Duration, Instant};
use parking_lot::Mutex;

/// Bounds how many ticker fetches run at once and how fast they start.
///
/// Price providers throttle free plans hard, so the parallel fan-out of a
/// pipeline run goes through this before each provider call.
pub struct RateLimiter {
    /// Semaphore to limit concurrent requests
    semaphore: Arc<Semaphore>,
    /// Last request timestamp to enforce minimum delay between requests
    last_request: Arc<Mutex<Instant>>,
    /// Minimum delay between requests
    min_delay: Duration,
}

impl RateLimiter {
    /// # Arguments
    /// * `max_concurrent` - Maximum number of concurrent provider requests
    /// * `requests_per_minute` - Maximum requests started per minute
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / requests_per_minute.max(1) as u64;
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(Instant::now() - Duration::from_secs(60))),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Waits for a free slot and for the minimum spacing since the previous
    /// request. The slot is released when the guard is dropped.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        // Reserve the next start slot while holding the lock
        let wait_time = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let next_slot = (*last + self.min_delay).max(now);
            *last = next_slot;
            next_slot - now
        };

        if !wait_time.is_zero() {
            sleep(wait_time).await;
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Guard that holds a rate limit permit
pub struct RateLimitGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
