//! Download configuration constants

use std::time::Duration;

/// Cooldown held after each observation page request, in seconds.
pub const DEFAULT_API_REQUEST_INTERVAL_SECS: f64 = 5.0;

/// Pages fetched per species.
pub const DEFAULT_PAGES_TO_FETCH: u32 = 2;

/// Observations per page (the API maximum).
pub const DEFAULT_PER_PAGE: u32 = 200;

/// Simultaneous image downloads across the whole run.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 16;

/// Maximum number of retries for transient page fetch failures.
pub const MAX_PAGE_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Exponential backoff policy for page fetch retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry (milliseconds)
    pub initial_ms: u64,
    /// Upper bound on any single delay (milliseconds)
    pub max_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_ms: INITIAL_BACKOFF_MS,
            max_ms: MAX_BACKOFF_MS,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry_count` (0-based)
    pub fn delay(&self, retry_count: u32) -> Duration {
        let factor = 2u64.checked_pow(retry_count).unwrap_or(u64::MAX);
        let delay_ms = self.initial_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(delay_ms)
    }
}
