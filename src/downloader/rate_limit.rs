//! Global request throttle for the observation API
//!
//! A single permit guards every observation page request in the process. The
//! holder runs its request, then keeps the permit for a fixed cooldown before
//! releasing it, so the next waiter cannot start until the cooldown is over.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::trace;

/// Single-permit rate limiter with a post-request cooldown
#[derive(Debug)]
pub struct RateLimiter {
    permit: Semaphore,
    cooldown: Duration,
}

impl RateLimiter {
    /// Create a limiter that holds its permit for `cooldown` after each action
    pub fn new(cooldown: Duration) -> Self {
        Self {
            permit: Semaphore::new(1),
            cooldown,
        }
    }

    /// Cooldown applied after every action
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Run `action` while holding the permit
    ///
    /// The permit is released only after `action` completes and the cooldown
    /// has fully elapsed. Waiters are served in FIFO order.
    pub async fn throttle<F, Fut, T>(&self, action: F) -> Result<T, RateLimitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self
            .permit
            .acquire()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;
        trace!("Rate limit permit acquired");

        let output = action().await;

        sleep(self.cooldown).await;
        trace!("Rate limit cooldown elapsed, releasing permit");
        Ok(output)
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire the permit
    #[error("failed to acquire rate limit permit: {0}")]
    AcquireError(String),
}
