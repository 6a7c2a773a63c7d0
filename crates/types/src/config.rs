//! Queue and retry configuration.

use std::time::Duration;

/// Configuration for exponential-backoff retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the second attempt (doubles each attempt after that).
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    /// Uniform jitter window applied as ±`jitter`.
    pub jitter: Duration,
    /// Total attempts per item before it is marked failed.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

/// Configuration for the upload queue service.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub retry: RetryConfig,
    /// Enqueue is rejected once this many non-terminal items exist.
    pub max_pending: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_pending: 50,
        }
    }
}
