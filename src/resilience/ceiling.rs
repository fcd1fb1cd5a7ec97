//! Global consecutive-failure ceiling.

/// Counts consecutive actor-step failures across the whole roster.
///
/// Any success resets the count. When a limit is set and the count reaches
/// it, the run must stop.
#[derive(Debug, Clone, Default)]
pub struct FailureCeiling {
    limit: Option<u32>,
    consecutive: u32,
}

impl FailureCeiling {
    /// Create a ceiling; `None` never trips
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit: limit.filter(|&l| l > 0),
            consecutive: 0,
        }
    }

    /// Record a failure and report whether the ceiling has been reached
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.is_reached()
    }

    /// Record a success
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Current consecutive failure count
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Configured limit
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Whether the ceiling has been reached
    pub fn is_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.consecutive >= limit)
    }
}
