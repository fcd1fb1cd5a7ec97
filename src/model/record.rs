//! Append-only records: interactions and metric snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::new_id;

/// Durable record of one actor's completed action in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionLog {
    /// Record ID
    pub id: String,
    /// Acting actor
    pub actor_id: String,
    /// Owning simulation
    pub simulation_id: String,
    /// Virtual timestamp (never earlier than the clock at the producing tick)
    pub timestamp: f64,
    /// Action type (e.g. "buy", "invest", "wait")
    pub action: String,
    /// Target actor id, or "system"
    pub target: String,
    /// Free-form outcome payload
    #[serde(default)]
    pub outcome: Value,
}

impl InteractionLog {
    /// Create a new interaction record
    pub fn new(
        simulation_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            id: new_id(),
            actor_id: actor_id.into(),
            simulation_id: simulation_id.into(),
            timestamp,
            action: action.into(),
            target: target.into(),
            outcome: Value::Null,
        }
    }

    /// Attach an outcome payload
    pub fn with_outcome(mut self, outcome: Value) -> Self {
        self.outcome = outcome;
        self
    }

    /// Outcome payload flattened to text (used by sentiment scoring).
    pub fn outcome_text(&self) -> String {
        match &self.outcome {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// One point of a metric time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Record ID
    pub id: String,
    /// Owning simulation
    pub simulation_id: String,
    /// Virtual timestamp
    pub timestamp: f64,
    /// Metric name (e.g. "adoption_rate")
    pub metric_type: String,
    /// Metric value
    pub value: f64,
}

impl MetricSnapshot {
    /// Create a new metric snapshot
    pub fn new(
        simulation_id: impl Into<String>,
        metric_type: impl Into<String>,
        value: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            id: new_id(),
            simulation_id: simulation_id.into(),
            timestamp,
            metric_type: metric_type.into(),
            value,
        }
    }
}
