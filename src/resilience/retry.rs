//! How many times a failed reasoning call is retried, and how long to
//! wait in between, before the actor falls back to `wait`.

use std::time::Duration;

use crate::config::ResilienceConfig;

/// Retry schedule for one actor's reasoning call
pub trait RetryPolicy: Send + Sync {
    /// Retries allowed after the first call
    fn max_attempts(&self) -> u32;
    /// Retry only transient provider failures (rate limits, network and
    /// provider-side errors), and only while attempts remain
    fn should_retry(&self, attempt: u32, is_transient: bool) -> bool;
    /// Wait before retry `attempt` (0-based)
    fn backoff(&self, attempt: u32) -> Duration;
}

/// Doubling wait between retries, capped at `max_backoff_ms`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Retries allowed after the first call
    pub max_attempts: u32,
    /// Wait before the first retry (ms)
    pub base_backoff_ms: u64,
    /// Longest wait between retries (ms)
    pub max_backoff_ms: u64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30000,
        }
    }
}

impl From<&ResilienceConfig> for ExponentialBackoff {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            base_backoff_ms: config.backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn should_retry(&self, attempt: u32, is_transient: bool) -> bool {
        is_transient && attempt < self.max_attempts
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let backoff = self.base_backoff_ms.saturating_mul(1 << attempt.min(10));
        Duration::from_millis(backoff.min(self.max_backoff_ms))
    }
}
