//! Event kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a published event. Serializes to its snake_case wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A tick completed
    Tick,
    /// An actor completed an action
    InteractionOccurred,
    /// Economics metrics recomputed
    MetricChanged,
    /// Run started
    SimulationStarted,
    /// Run paused
    SimulationPaused,
    /// Run resumed
    SimulationResumed,
    /// Run stopped
    SimulationStopped,
    /// Per-actor sentiment averages and trends
    SentimentUpdate,
    /// Recent emergence flags
    EmergenceFlags,
    /// Coalitions recomputed
    CoalitionsDetected,
    /// Venture stage changed
    PhaseTransition,
    /// Actor joined the roster
    AgentCreated,
    /// One actor messaged another
    AgentMessage,
    /// Random crisis
    Crisis,
    /// Random macroeconomic shift
    MacroEvent,
    /// Random market disruption
    Disruption,
    /// Ally dialogue transcript
    Conversation,
    /// Rival debate transcript
    Debate,
    /// Checkpoint written
    Checkpoint,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [EventKind; 19] = [
        Self::Tick,
        Self::InteractionOccurred,
        Self::MetricChanged,
        Self::SimulationStarted,
        Self::SimulationPaused,
        Self::SimulationResumed,
        Self::SimulationStopped,
        Self::SentimentUpdate,
        Self::EmergenceFlags,
        Self::CoalitionsDetected,
        Self::PhaseTransition,
        Self::AgentCreated,
        Self::AgentMessage,
        Self::Crisis,
        Self::MacroEvent,
        Self::Disruption,
        Self::Conversation,
        Self::Debate,
        Self::Checkpoint,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::InteractionOccurred => "interaction_occurred",
            Self::MetricChanged => "metric_changed",
            Self::SimulationStarted => "simulation_started",
            Self::SimulationPaused => "simulation_paused",
            Self::SimulationResumed => "simulation_resumed",
            Self::SimulationStopped => "simulation_stopped",
            Self::SentimentUpdate => "sentiment_update",
            Self::EmergenceFlags => "emergence_flags",
            Self::CoalitionsDetected => "coalitions_detected",
            Self::PhaseTransition => "phase_transition",
            Self::AgentCreated => "agent_created",
            Self::AgentMessage => "agent_message",
            Self::Crisis => "crisis",
            Self::MacroEvent => "macro_event",
            Self::Disruption => "disruption",
            Self::Conversation => "conversation",
            Self::Debate => "debate",
            Self::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown event kind: {}", s))
    }
}
