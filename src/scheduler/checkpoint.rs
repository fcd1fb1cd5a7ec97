//! Checkpoint payload.
//!
//! A checkpoint captures everything the scheduler needs to continue a run
//! with a fresh instance: the clock, per-actor memory tails and step
//! counters, the relationship edges and the analytics state. Interactions
//! and metrics are already durable and are reloaded from storage instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::MemoryEntry;
use crate::analytics::{EmergenceState, SentimentEntry};
use crate::economics::MetricSet;
use crate::error::Result;
use crate::model::Stage;
use crate::social::{Coalition, EdgeRecord};

/// Parameter-map key the payload is embedded under
pub const CHECKPOINT_KEY: &str = "checkpoint";

/// Current payload layout
pub const CHECKPOINT_VERSION: u32 = 1;

/// Step counter and difficulty of one actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorProgress {
    /// Steps taken
    pub steps: u64,
    /// Difficulty scalar
    pub difficulty: f64,
}

/// Serialized scheduler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Payload layout version
    pub version: u32,
    /// Virtual clock
    pub current_time: f64,
    /// Completed ticks
    pub tick_count: u64,
    /// Stage at checkpoint time
    pub stage: Stage,
    /// Most recent memories per actor id
    pub agent_memories: BTreeMap<String, Vec<MemoryEntry>>,
    /// Step counters per actor id
    #[serde(default)]
    pub agent_progress: BTreeMap<String, ActorProgress>,
    /// Relationship edges
    pub relationships: Vec<EdgeRecord>,
    /// Emergence detector state
    pub emergence_state: EmergenceState,
    /// Sentiment history tails per actor id
    pub sentiment_history: BTreeMap<String, Vec<SentimentEntry>>,
    /// Last detected coalitions
    #[serde(default)]
    pub coalitions: Vec<Coalition>,
    /// Last metrics cycle
    #[serde(default)]
    pub latest_metrics: Option<MetricSet>,
}

impl CheckpointPayload {
    /// Encode for storage
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode from storage
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::MemoryKind;

    #[test]
    fn test_payload_uses_stable_field_names() {
        let mut memories = BTreeMap::new();
        memories.insert(
            "a1".to_string(),
            vec![MemoryEntry::new(MemoryKind::Internal, "Thought: hm", 5.0)],
        );
        let payload = CheckpointPayload {
            version: CHECKPOINT_VERSION,
            current_time: 105.0,
            tick_count: 5,
            stage: Stage::Mvp,
            agent_memories: memories,
            agent_progress: BTreeMap::from([(
                "a1".to_string(),
                ActorProgress {
                    steps: 5,
                    difficulty: 1.1,
                },
            )]),
            relationships: Vec::new(),
            emergence_state: EmergenceState::default(),
            sentiment_history: BTreeMap::new(),
            coalitions: Vec::new(),
            latest_metrics: None,
        };

        let value = payload.to_value().unwrap();
        assert_eq!(value["tick_count"], 5);
        assert_eq!(value["current_time"], 105.0);
        assert_eq!(value["stage"], "mvp");
        assert!(value["agent_memories"]["a1"].is_array());
        assert_eq!(value["agent_progress"]["a1"]["steps"], 5);
        assert_eq!(CheckpointPayload::from_value(value).unwrap(), payload);
    }

    #[test]
    fn test_missing_optional_sections_default() {
        let value = serde_json::json!({
            "version": 1,
            "current_time": 1.0,
            "tick_count": 1,
            "stage": "idea",
            "agent_memories": {},
            "relationships": [],
            "emergence_state": {"action_history": [], "flags": [], "observed": 0},
            "sentiment_history": {}
        });
        let payload = CheckpointPayload::from_value(value).unwrap();
        assert!(payload.coalitions.is_empty());
        assert!(payload.agent_progress.is_empty());
        assert!(payload.latest_metrics.is_none());
    }
}
