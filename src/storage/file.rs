//! Directory-per-simulation JSON storage backend.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::Storage;
use crate::error::{Result, SimError};
use crate::model::{ActorEntity, InteractionLog, MetricSnapshot, SimulationEntity};

const SIMULATION_FILE: &str = "simulation.json";
const AGENTS_FILE: &str = "agents.json";
const INTERACTIONS_FILE: &str = "interactions.jsonl";
const METRICS_FILE: &str = "metrics.jsonl";
const CHECKPOINT_FILE: &str = "checkpoint.json";

/// File-backed storage rooted at a data directory
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) a data directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            SimError::Storage(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Data root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sim_dir(&self, simulation_id: &str) -> Result<PathBuf> {
        if simulation_id.is_empty()
            || simulation_id.contains(['/', '\\'])
            || simulation_id.starts_with('.')
        {
            return Err(SimError::Storage(format!(
                "Invalid simulation id: {:?}",
                simulation_id
            )));
        }
        Ok(self.root.join(simulation_id))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| SimError::Storage("file store lock poisoned".to_string()))
    }

    fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, bytes).map_err(|e| storage_io(path, &e))?;
        fs::rename(&tmp, path).map_err(|e| storage_io(path, &e))?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_io(path, &e)),
        }
    }

    fn append_lines<T: Serialize>(&self, simulation_id: &str, file: &str, items: &[T]) -> Result<()> {
        let dir = self.sim_dir(simulation_id)?;
        let _guard = self.lock()?;
        fs::create_dir_all(&dir).map_err(|e| storage_io(&dir, &e))?;
        let path = dir.join(file);
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| storage_io(&path, &e))?;
        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item)?;
            buf.push(b'\n');
        }
        out.write_all(&buf).map_err(|e| storage_io(&path, &e))?;
        Ok(())
    }

    fn read_lines<T: DeserializeOwned>(&self, simulation_id: &str, file: &str) -> Result<Vec<T>> {
        let path = self.sim_dir(simulation_id)?.join(file);
        let handle = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_io(&path, &e)),
        };
        let mut items = Vec::new();
        for line in BufReader::new(handle).lines() {
            let line = line.map_err(|e| storage_io(&path, &e))?;
            if line.trim().is_empty() {
                continue;
            }
            items.push(serde_json::from_str(&line)?);
        }
        Ok(items)
    }

    fn rewrite_lines<T: Serialize>(&self, simulation_id: &str, file: &str, items: &[T]) -> Result<()> {
        let path = self.sim_dir(simulation_id)?.join(file);
        let tmp = path.with_extension("jsonl.tmp");
        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item)?;
            buf.push(b'\n');
        }
        fs::write(&tmp, buf).map_err(|e| storage_io(&path, &e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_io(&path, &e))?;
        Ok(())
    }
}

fn storage_io(path: &Path, err: &std::io::Error) -> SimError {
    SimError::Storage(format!("{}: {}", path.display(), err))
}

impl Storage for FileStorage {
    fn create_simulation(&self, simulation: &SimulationEntity) -> Result<()> {
        let dir = self.sim_dir(&simulation.id)?;
        let _guard = self.lock()?;
        let path = dir.join(SIMULATION_FILE);
        if path.exists() {
            return Err(SimError::Storage(format!(
                "Simulation already exists: {}",
                simulation.id
            )));
        }
        fs::create_dir_all(&dir).map_err(|e| storage_io(&dir, &e))?;
        Self::write_json(&path, simulation)
    }

    fn get_simulation(&self, simulation_id: &str) -> Result<SimulationEntity> {
        let path = self.sim_dir(simulation_id)?.join(SIMULATION_FILE);
        Self::read_json(&path)?
            .ok_or_else(|| SimError::SimulationNotFound(simulation_id.to_string()))
    }

    fn list_simulations(&self) -> Result<Vec<SimulationEntity>> {
        let entries = fs::read_dir(&self.root).map_err(|e| storage_io(&self.root, &e))?;
        let mut sims = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_io(&self.root, &e))?;
            let path = entry.path().join(SIMULATION_FILE);
            if let Some(sim) = Self::read_json::<SimulationEntity>(&path)? {
                sims.push(sim);
            }
        }
        sims.sort_by(|a, b| a.created_at.total_cmp(&b.created_at));
        Ok(sims)
    }

    fn update_simulation(&self, simulation: &SimulationEntity) -> Result<()> {
        let path = self.sim_dir(&simulation.id)?.join(SIMULATION_FILE);
        let _guard = self.lock()?;
        if !path.exists() {
            return Err(SimError::SimulationNotFound(simulation.id.clone()));
        }
        Self::write_json(&path, simulation)
    }

    fn save_agent(&self, simulation_id: &str, actor: &ActorEntity) -> Result<()> {
        let dir = self.sim_dir(simulation_id)?;
        let _guard = self.lock()?;
        fs::create_dir_all(&dir).map_err(|e| storage_io(&dir, &e))?;
        let path = dir.join(AGENTS_FILE);
        let mut agents: Vec<ActorEntity> = Self::read_json(&path)?.unwrap_or_default();
        match agents.iter_mut().find(|a| a.id == actor.id) {
            Some(slot) => *slot = actor.clone(),
            None => agents.push(actor.clone()),
        }
        Self::write_json(&path, &agents)
    }

    fn get_agents(&self, simulation_id: &str) -> Result<Vec<ActorEntity>> {
        let path = self.sim_dir(simulation_id)?.join(AGENTS_FILE);
        Ok(Self::read_json(&path)?.unwrap_or_default())
    }

    fn log_interaction(&self, log: &InteractionLog) -> Result<()> {
        self.append_lines(&log.simulation_id, INTERACTIONS_FILE, std::slice::from_ref(log))
    }

    fn log_interactions(&self, logs: &[InteractionLog]) -> Result<()> {
        // Batches from the scheduler always belong to one simulation
        let mut start = 0;
        while start < logs.len() {
            let sim = &logs[start].simulation_id;
            let end = logs[start..]
                .iter()
                .position(|l| &l.simulation_id != sim)
                .map_or(logs.len(), |offset| start + offset);
            self.append_lines(sim, INTERACTIONS_FILE, &logs[start..end])?;
            start = end;
        }
        Ok(())
    }

    fn get_interactions(&self, simulation_id: &str) -> Result<Vec<InteractionLog>> {
        self.read_lines(simulation_id, INTERACTIONS_FILE)
    }

    fn log_metric(&self, metric: &MetricSnapshot) -> Result<()> {
        self.append_lines(&metric.simulation_id, METRICS_FILE, std::slice::from_ref(metric))
    }

    fn get_metrics(
        &self,
        simulation_id: &str,
        metric_type: Option<&str>,
    ) -> Result<Vec<MetricSnapshot>> {
        let all: Vec<MetricSnapshot> = self.read_lines(simulation_id, METRICS_FILE)?;
        Ok(match metric_type {
            Some(ty) => all.into_iter().filter(|m| m.metric_type == ty).collect(),
            None => all,
        })
    }

    fn truncate_after(&self, simulation_id: &str, timestamp: f64) -> Result<usize> {
        let _guard = self.lock()?;
        let interactions: Vec<InteractionLog> = self.read_lines(simulation_id, INTERACTIONS_FILE)?;
        let metrics: Vec<MetricSnapshot> = self.read_lines(simulation_id, METRICS_FILE)?;
        let mut removed = 0;

        let kept: Vec<&InteractionLog> =
            interactions.iter().filter(|l| l.timestamp <= timestamp).collect();
        if kept.len() < interactions.len() {
            removed += interactions.len() - kept.len();
            self.rewrite_lines(simulation_id, INTERACTIONS_FILE, &kept)?;
        }
        let kept: Vec<&MetricSnapshot> =
            metrics.iter().filter(|m| m.timestamp <= timestamp).collect();
        if kept.len() < metrics.len() {
            removed += metrics.len() - kept.len();
            self.rewrite_lines(simulation_id, METRICS_FILE, &kept)?;
        }
        Ok(removed)
    }

    fn write_checkpoint(&self, simulation_id: &str, payload: &Value) -> Result<()> {
        let dir = self.sim_dir(simulation_id)?;
        let _guard = self.lock()?;
        fs::create_dir_all(&dir).map_err(|e| storage_io(&dir, &e))?;
        Self::write_json(&dir.join(CHECKPOINT_FILE), payload)
    }

    fn read_checkpoint(&self, simulation_id: &str) -> Result<Option<Value>> {
        Self::read_json(&self.sim_dir(simulation_id)?.join(CHECKPOINT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, StakeholderKind};

    #[test]
    fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();

        let sim = SimulationEntity::new("Acme", "edtech", Stage::Idea).with_param("seed", 7);
        store.create_simulation(&sim).unwrap();
        store
            .save_agent(&sim.id, &ActorEntity::new(StakeholderKind::Media, "Tech Journalist"))
            .unwrap();
        store
            .log_interactions(&[
                InteractionLog::new(&sim.id, "a", "buy", "system", 1.0),
                InteractionLog::new(&sim.id, "b", "sell", "a", 2.0),
            ])
            .unwrap();
        store
            .log_metric(&MetricSnapshot::new(&sim.id, "burn_rate", 5000.0, 2.0))
            .unwrap();

        // Reopen to prove nothing lives only in memory
        let store = FileStorage::open(dir.path()).unwrap();
        assert_eq!(store.get_simulation(&sim.id).unwrap(), sim);
        assert_eq!(store.get_agents(&sim.id).unwrap().len(), 1);
        let interactions = store.get_interactions(&sim.id).unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[1].action, "sell");
        assert_eq!(store.get_metrics(&sim.id, Some("burn_rate")).unwrap().len(), 1);
        assert_eq!(store.list_simulations().unwrap().len(), 1);
    }

    #[test]
    fn test_truncate_after_rewrites_logs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        store
            .log_interactions(&[
                InteractionLog::new("sim-1", "a", "buy", "startup", 1.0),
                InteractionLog::new("sim-1", "a", "buy", "startup", 2.0),
                InteractionLog::new("sim-1", "a", "buy", "startup", 3.0),
            ])
            .unwrap();
        store
            .log_metric(&MetricSnapshot::new("sim-1", "revenue", 100.0, 3.0))
            .unwrap();

        assert_eq!(store.truncate_after("sim-1", 2.0).unwrap(), 2);
        // Appends after a rewrite land behind the kept lines
        store
            .log_interaction(&InteractionLog::new("sim-1", "a", "sell", "startup", 3.0))
            .unwrap();

        let store = FileStorage::open(dir.path()).unwrap();
        let actions: Vec<String> = store
            .get_interactions("sim-1")
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(actions, vec!["buy", "buy", "sell"]);
        assert!(store.get_metrics("sim-1", None).unwrap().is_empty());
        assert_eq!(store.truncate_after("sim-1", 10.0).unwrap(), 0);
    }

    #[test]
    fn test_checkpoint_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        assert!(store.read_checkpoint("sim-1").unwrap().is_none());

        store
            .write_checkpoint("sim-1", &serde_json::json!({"tick_count": 100}))
            .unwrap();
        store
            .write_checkpoint("sim-1", &serde_json::json!({"tick_count": 200}))
            .unwrap();
        let cp = store.read_checkpoint("sim-1").unwrap().unwrap();
        assert_eq!(cp["tick_count"], 200);
    }

    #[test]
    fn test_missing_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(
            store.get_simulation("nope"),
            Err(SimError::SimulationNotFound(_))
        ));
        assert!(matches!(
            store.get_interactions("../etc"),
            Err(SimError::Storage(_))
        ));
        let sim = SimulationEntity::new("Ghost", "ai", Stage::Idea);
        assert!(matches!(
            store.update_simulation(&sim),
            Err(SimError::SimulationNotFound(_))
        ));
    }
}
