//! Persistence collaborator.
//!
//! The core only needs a record store with create/read/append operations and
//! a checkpoint slot per simulation. Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: process-local, used by tests and throwaway runs
//! - [`FileStorage`]: one directory per simulation under a data root
//!
//! ```text
//! <data_dir>/<simulation_id>/
//!     simulation.json
//!     agents.json
//!     interactions.jsonl
//!     metrics.jsonl
//!     checkpoint.json
//! ```
//!
//! Failures propagate to the caller as [`SimError::Storage`] (or
//! [`SimError::SimulationNotFound`]); nothing is swallowed here.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use serde_json::Value;

use crate::config::StorageConfig;
use crate::error::{Result, SimError};
use crate::model::{ActorEntity, InteractionLog, MetricSnapshot, SimulationEntity};

/// Record store used by the scheduler.
pub trait Storage: Send + Sync {
    /// Persist a new simulation
    fn create_simulation(&self, simulation: &SimulationEntity) -> Result<()>;

    /// Load a simulation by id
    fn get_simulation(&self, simulation_id: &str) -> Result<SimulationEntity>;

    /// All known simulations
    fn list_simulations(&self) -> Result<Vec<SimulationEntity>>;

    /// Replace the stored simulation record (parameters, stage)
    fn update_simulation(&self, simulation: &SimulationEntity) -> Result<()>;

    /// Insert or replace an actor of a simulation
    fn save_agent(&self, simulation_id: &str, actor: &ActorEntity) -> Result<()>;

    /// Actors of a simulation, in save order
    fn get_agents(&self, simulation_id: &str) -> Result<Vec<ActorEntity>>;

    /// Append one interaction
    fn log_interaction(&self, log: &InteractionLog) -> Result<()>;

    /// Append a batch of interactions in order
    fn log_interactions(&self, logs: &[InteractionLog]) -> Result<()> {
        for log in logs {
            self.log_interaction(log)?;
        }
        Ok(())
    }

    /// Interactions of a simulation, in append order
    fn get_interactions(&self, simulation_id: &str) -> Result<Vec<InteractionLog>>;

    /// Append one metric snapshot
    fn log_metric(&self, metric: &MetricSnapshot) -> Result<()>;

    /// Metric snapshots of a simulation, optionally filtered by type
    fn get_metrics(&self, simulation_id: &str, metric_type: Option<&str>)
        -> Result<Vec<MetricSnapshot>>;

    /// Drop interactions and metric snapshots stamped after `timestamp`.
    ///
    /// Used when resuming from a checkpoint, since the ticks past it are
    /// replayed. Returns the number of records removed.
    fn truncate_after(&self, simulation_id: &str, timestamp: f64) -> Result<usize>;

    /// Overwrite the checkpoint slot
    fn write_checkpoint(&self, simulation_id: &str, payload: &Value) -> Result<()>;

    /// Read the checkpoint slot, if any
    fn read_checkpoint(&self, simulation_id: &str) -> Result<Option<Value>>;
}

/// Build the configured backend
pub fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        "file" => Ok(Arc::new(FileStorage::open(&config.data_dir)?)),
        other => Err(SimError::Config(format!("Unknown storage backend: {}", other))),
    }
}
