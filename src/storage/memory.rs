//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::Storage;
use crate::error::{Result, SimError};
use crate::model::{ActorEntity, InteractionLog, MetricSnapshot, SimulationEntity};

#[derive(Debug, Default)]
struct Tables {
    simulations: Vec<SimulationEntity>,
    agents: HashMap<String, Vec<ActorEntity>>,
    interactions: HashMap<String, Vec<InteractionLog>>,
    metrics: HashMap<String, Vec<MetricSnapshot>>,
    checkpoints: HashMap<String, Value>,
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| SimError::Storage("memory store lock poisoned".to_string()))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| SimError::Storage("memory store lock poisoned".to_string()))?;
        Ok(f(&mut tables))
    }
}

impl Storage for MemoryStorage {
    fn create_simulation(&self, simulation: &SimulationEntity) -> Result<()> {
        self.write(|t| {
            if t.simulations.iter().any(|s| s.id == simulation.id) {
                return Err(SimError::Storage(format!(
                    "Simulation already exists: {}",
                    simulation.id
                )));
            }
            t.simulations.push(simulation.clone());
            Ok(())
        })?
    }

    fn get_simulation(&self, simulation_id: &str) -> Result<SimulationEntity> {
        self.read(|t| t.simulations.iter().find(|s| s.id == simulation_id).cloned())?
            .ok_or_else(|| SimError::SimulationNotFound(simulation_id.to_string()))
    }

    fn list_simulations(&self) -> Result<Vec<SimulationEntity>> {
        self.read(|t| t.simulations.clone())
    }

    fn update_simulation(&self, simulation: &SimulationEntity) -> Result<()> {
        self.write(|t| match t.simulations.iter_mut().find(|s| s.id == simulation.id) {
            Some(slot) => {
                *slot = simulation.clone();
                Ok(())
            },
            None => Err(SimError::SimulationNotFound(simulation.id.clone())),
        })?
    }

    fn save_agent(&self, simulation_id: &str, actor: &ActorEntity) -> Result<()> {
        self.write(|t| {
            let agents = t.agents.entry(simulation_id.to_string()).or_default();
            match agents.iter_mut().find(|a| a.id == actor.id) {
                Some(slot) => *slot = actor.clone(),
                None => agents.push(actor.clone()),
            }
        })
    }

    fn get_agents(&self, simulation_id: &str) -> Result<Vec<ActorEntity>> {
        self.read(|t| t.agents.get(simulation_id).cloned().unwrap_or_default())
    }

    fn log_interaction(&self, log: &InteractionLog) -> Result<()> {
        self.write(|t| {
            t.interactions
                .entry(log.simulation_id.clone())
                .or_default()
                .push(log.clone());
        })
    }

    fn log_interactions(&self, logs: &[InteractionLog]) -> Result<()> {
        self.write(|t| {
            for log in logs {
                t.interactions
                    .entry(log.simulation_id.clone())
                    .or_default()
                    .push(log.clone());
            }
        })
    }

    fn get_interactions(&self, simulation_id: &str) -> Result<Vec<InteractionLog>> {
        self.read(|t| t.interactions.get(simulation_id).cloned().unwrap_or_default())
    }

    fn log_metric(&self, metric: &MetricSnapshot) -> Result<()> {
        self.write(|t| {
            t.metrics
                .entry(metric.simulation_id.clone())
                .or_default()
                .push(metric.clone());
        })
    }

    fn get_metrics(
        &self,
        simulation_id: &str,
        metric_type: Option<&str>,
    ) -> Result<Vec<MetricSnapshot>> {
        self.read(|t| {
            t.metrics
                .get(simulation_id)
                .map(|all| {
                    all.iter()
                        .filter(|m| metric_type.map_or(true, |ty| m.metric_type == ty))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn truncate_after(&self, simulation_id: &str, timestamp: f64) -> Result<usize> {
        self.write(|t| {
            let mut removed = 0;
            if let Some(logs) = t.interactions.get_mut(simulation_id) {
                let before = logs.len();
                logs.retain(|l| l.timestamp <= timestamp);
                removed += before - logs.len();
            }
            if let Some(metrics) = t.metrics.get_mut(simulation_id) {
                let before = metrics.len();
                metrics.retain(|m| m.timestamp <= timestamp);
                removed += before - metrics.len();
            }
            removed
        })
    }

    fn write_checkpoint(&self, simulation_id: &str, payload: &Value) -> Result<()> {
        self.write(|t| {
            t.checkpoints
                .insert(simulation_id.to_string(), payload.clone());
        })
    }

    fn read_checkpoint(&self, simulation_id: &str) -> Result<Option<Value>> {
        self.read(|t| t.checkpoints.get(simulation_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, StakeholderKind};

    #[test]
    fn test_simulation_crud() {
        let store = MemoryStorage::new();
        let sim = SimulationEntity::new("Acme", "fintech", Stage::Mvp);
        store.create_simulation(&sim).unwrap();
        assert!(store.create_simulation(&sim).is_err());

        let mut loaded = store.get_simulation(&sim.id).unwrap();
        assert_eq!(loaded, sim);

        loaded.stage = Stage::Launch;
        store.update_simulation(&loaded).unwrap();
        assert_eq!(store.get_simulation(&sim.id).unwrap().stage, Stage::Launch);
        assert_eq!(store.list_simulations().unwrap().len(), 1);

        assert!(matches!(
            store.get_simulation("missing"),
            Err(SimError::SimulationNotFound(_))
        ));
    }

    #[test]
    fn test_agents_upsert() {
        let store = MemoryStorage::new();
        let actor = ActorEntity::new(StakeholderKind::Customer, "Early Adopter").with_id("a1");
        store.save_agent("sim", &actor).unwrap();
        store
            .save_agent("sim", &actor.clone().with_rule("Be loud"))
            .unwrap();
        let agents = store.get_agents("sim").unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].behavior_rules, vec!["Be loud".to_string()]);
    }

    #[test]
    fn test_metric_filter() {
        let store = MemoryStorage::new();
        store
            .log_metric(&MetricSnapshot::new("sim", "adoption_rate", 0.1, 1.0))
            .unwrap();
        store
            .log_metric(&MetricSnapshot::new("sim", "churn_rate", 0.2, 1.0))
            .unwrap();
        assert_eq!(store.get_metrics("sim", None).unwrap().len(), 2);
        assert_eq!(
            store.get_metrics("sim", Some("churn_rate")).unwrap()[0].value,
            0.2
        );
    }

    #[test]
    fn test_truncate_after_keeps_records_up_to_timestamp() {
        let store = MemoryStorage::new();
        store
            .log_interactions(&[
                InteractionLog::new("sim", "a", "buy", "startup", 9.0),
                InteractionLog::new("sim", "a", "buy", "startup", 10.0),
                InteractionLog::new("sim", "a", "buy", "startup", 11.0),
                InteractionLog::new("other", "b", "buy", "startup", 12.0),
            ])
            .unwrap();
        store
            .log_metric(&MetricSnapshot::new("sim", "revenue", 100.0, 10.0))
            .unwrap();
        store
            .log_metric(&MetricSnapshot::new("sim", "revenue", 200.0, 12.0))
            .unwrap();

        assert_eq!(store.truncate_after("sim", 10.0).unwrap(), 2);
        let kept: Vec<f64> = store
            .get_interactions("sim")
            .unwrap()
            .iter()
            .map(|l| l.timestamp)
            .collect();
        assert_eq!(kept, vec![9.0, 10.0]);
        assert_eq!(store.get_metrics("sim", None).unwrap().len(), 1);
        assert_eq!(store.get_interactions("other").unwrap().len(), 1);
        assert_eq!(store.truncate_after("missing", 0.0).unwrap(), 0);
    }
}
