//! Core data model.
//!
//! Entities owned by the scheduler for the duration of a run and persisted by
//! the storage collaborator:
//!
//! | Type | Lifetime | Persisted |
//! |------|----------|-----------|
//! | [`SimulationEntity`] | whole run | yes (checkpoint payload embedded in parameters) |
//! | [`ActorEntity`] | whole run | yes |
//! | [`InteractionLog`] | append-only | yes (batched) |
//! | [`MetricSnapshot`] | append-only | yes |

mod entity;
mod record;

pub use entity::{ActorEntity, Parameters, SimulationEntity, Stage, StakeholderKind};
pub use record::{InteractionLog, MetricSnapshot};

/// Current wall-clock time as fractional unix seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Generate a fresh entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
