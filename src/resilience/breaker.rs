//! Trip switch for the reasoning provider.
//!
//! While tripped, actor steps skip the provider and fall back to `wait`
//! instead of spending a full retry budget on every actor of every tick.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Trips after `threshold` reasoning calls fail in a row. For the next
/// `reset_timeout_ms` of wall-clock time decisions are refused outright;
/// after that the next actor step tries the provider again.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Reasoning calls failed in a row
    failures: AtomicUsize,
    /// Wall-clock ms until which decisions are refused, 0 when untripped
    open_until: AtomicU64,
    /// Failed calls that trip the switch
    threshold: usize,
    /// How long a trip lasts
    reset_timeout_ms: u64,
}

impl CircuitBreaker {
    /// Breaker tripping after `threshold` failed calls for `reset_timeout_ms`
    pub fn new(threshold: usize, reset_timeout_ms: u64) -> Self {
        Self {
            failures: AtomicUsize::new(0),
            open_until: AtomicU64::new(0),
            threshold: threshold.max(1),
            reset_timeout_ms,
        }
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// True while reasoning calls are refused
    pub fn is_open(&self) -> bool {
        let open_until = self.open_until.load(Ordering::Relaxed);
        // Once the trip lapses the next actor step retries the provider
        open_until > 0 && Self::now_ms() < open_until
    }

    /// Reasoning calls failed in a row
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// A decision came back; clears the failure streak
    pub fn record_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
        self.open_until.store(0, Ordering::Relaxed);
    }

    /// A reasoning call failed after its retries; may trip the switch
    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.threshold {
            let open_until = Self::now_ms() + self.reset_timeout_ms;
            self.open_until.store(open_until, Ordering::Relaxed);
            tracing::warn!(failures, "Reasoning provider tripped, actors will wait");
        }
    }

    /// Forget failures and any active trip
    pub fn reset(&self) {
        self.failures.store(0, Ordering::Relaxed);
        self.open_until.store(0, Ordering::Relaxed);
    }
}
