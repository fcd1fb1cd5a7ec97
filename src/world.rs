//! Shared world-state snapshot handed to every actor each tick.
//!
//! The snapshot is rebuilt by the scheduler at the start of each tick from
//! the roster, the latest metrics cycle, the active random event, recent
//! emergence flags and the per-actor sentiment map. Fields actors are known
//! to read are typed; anything else rides in [`WorldSnapshot::extensions`]
//! under a versioned key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::EmergenceFlag;
use crate::model::{ActorEntity, Stage, StakeholderKind};
use crate::scenario::WorldEvent;

/// Current extension schema version.
pub const EXTENSIONS_VERSION: u32 = 1;

/// One roster line as seen by actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Actor id
    pub id: String,
    /// Display name
    pub name: String,
    /// Role label
    pub role: String,
    /// Stakeholder category
    pub kind: StakeholderKind,
}

impl From<&ActorEntity> for RosterEntry {
    fn from(entity: &ActorEntity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            role: entity.role.clone(),
            kind: entity.kind,
        }
    }
}

/// Read-only view of the world at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Simulation id
    pub simulation_id: String,
    /// Venture name
    pub venture: String,
    /// Industry label
    pub industry: String,
    /// Tick number
    pub tick: u64,
    /// Virtual clock (unix seconds)
    pub timestamp: f64,
    /// Current stage
    pub stage: Stage,
    /// Spawned actors
    pub roster: Vec<RosterEntry>,
    /// Latest metrics cycle (may be up to one metrics interval stale)
    pub metrics: BTreeMap<String, f64>,
    /// Random events active this tick
    pub active_events: Vec<WorldEvent>,
    /// Recent emergence flags
    pub emergence_flags: Vec<EmergenceFlag>,
    /// Moving-average sentiment per actor
    pub sentiments: BTreeMap<String, f64>,
    /// Extension schema version
    pub extensions_version: u32,
    /// Optional extension fields
    #[serde(default)]
    pub extensions: BTreeMap<String, Value>,
}

impl WorldSnapshot {
    /// Empty snapshot for a simulation before its first tick
    pub fn new(
        simulation_id: impl Into<String>,
        venture: impl Into<String>,
        industry: impl Into<String>,
        stage: Stage,
        timestamp: f64,
    ) -> Self {
        Self {
            simulation_id: simulation_id.into(),
            venture: venture.into(),
            industry: industry.into(),
            tick: 0,
            timestamp,
            stage,
            roster: Vec::new(),
            metrics: BTreeMap::new(),
            active_events: Vec::new(),
            emergence_flags: Vec::new(),
            sentiments: BTreeMap::new(),
            extensions_version: EXTENSIONS_VERSION,
            extensions: BTreeMap::new(),
        }
    }

    /// Metric value, if a metrics cycle has produced it
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Sentiment of one actor, 0.0 when unknown
    pub fn sentiment_of(&self, actor_id: &str) -> f64 {
        self.sentiments.get(actor_id).copied().unwrap_or(0.0)
    }

    /// Human-readable date of the virtual clock
    pub fn date(&self) -> String {
        chrono::DateTime::from_timestamp(self.timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| format!("t={:.0}", self.timestamp))
    }

    /// Compact text rendering used in reasoning prompts.
    pub fn render_context(&self) -> String {
        let mut out = format!(
            "Date: {}\nTick: {}\nVenture: {} ({} industry, {} stage)\n",
            self.date(),
            self.tick,
            self.venture,
            self.industry,
            self.stage
        );
        if !self.metrics.is_empty() {
            out.push_str("Metrics:\n");
            for (name, value) in &self.metrics {
                out.push_str(&format!("  {}: {:.4}\n", name, value));
            }
        }
        if !self.active_events.is_empty() {
            out.push_str("Active events:\n");
            for event in &self.active_events {
                out.push_str(&format!("  {}: {}\n", event.name, event.description));
            }
        }
        if !self.emergence_flags.is_empty() {
            out.push_str("Market signals:\n");
            for flag in &self.emergence_flags {
                out.push_str(&format!("  {}\n", flag.description));
            }
        }
        if !self.roster.is_empty() {
            out.push_str("Stakeholders:\n");
            for entry in &self.roster {
                out.push_str(&format!("  {} [{}] id={}\n", entry.name, entry.kind, entry.id));
            }
        }
        out
    }
}
