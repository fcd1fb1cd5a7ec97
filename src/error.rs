//! Simulation error types.
//!
//! # Failure Classification
//!
//! Errors are grouped by how the tick loop reacts to them:
//!
//! - **Transient external failures** (`Reasoning`, `RateLimited`, `ProviderUnavailable`) are
//!   retried inside the reasoning-provider boundary and never reach the tick loop; actors
//!   degrade to a neutral decision instead.
//! - **Per-actor failures** (`InvariantViolation`, `ActorStep`) are isolated by the scheduler
//!   and counted toward the consecutive-failure ceiling.
//! - **Persistence failures** (`Storage`, `SimulationNotFound`, `Io`, `Json`) propagate to the
//!   caller of the operation that triggered them.
//! - **Lifecycle misuse** (`InvalidTransition`) is rejected at the call site.

use thiserror::Error;

/// Simulation errors.
#[derive(Error, Debug)]
pub enum SimError {
    /// Reasoning provider returned an error response.
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    /// Reasoning provider rate limited the request.
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait before retrying
        retry_after_ms: u64,
    },

    /// Reasoning provider still failing after bounded retries, or tripped after repeated failures.
    #[error("Provider unavailable after {attempts} attempts: {last_error}")]
    ProviderUnavailable {
        /// Number of attempts made
        attempts: u32,
        /// The last error message
        last_error: String,
    },

    /// An actor produced an interaction that broke one of its invariants.
    #[error("Invariant '{invariant}' violated by actor {actor}: {detail}")]
    InvariantViolation {
        /// Offending actor
        actor: String,
        /// Invariant name
        invariant: String,
        /// What went wrong
        detail: String,
    },

    /// Unexpected failure inside an actor step.
    #[error("Actor {actor} step failed: {reason}")]
    ActorStep {
        /// Offending actor
        actor: String,
        /// Failure description
        reason: String,
    },

    /// Lifecycle transition not permitted from the current state.
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        /// Current lifecycle state
        from: String,
        /// Requested action
        action: String,
    },

    /// Persistence backend failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Simulation id unknown to the persistence backend.
    #[error("Simulation not found: {0}")]
    SimulationNotFound(String),

    /// Network communication error.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Whether the error is a transient provider failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SimError::RateLimited { .. } | SimError::Network(_) | SimError::Reasoning(_)
        )
    }

    /// Whether the error is a rate limit.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SimError::RateLimited { .. })
    }
}

/// Result type alias for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

impl From<reqwest::Error> for SimError {
    fn from(err: reqwest::Error) -> Self {
        SimError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(err.to_string())
    }
}
