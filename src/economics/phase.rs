//! Stage progression gated on elapsed ticks and adoption.

use serde::{Deserialize, Serialize};

use crate::model::Stage;

/// Stages the manager walks through, in order
pub const PHASES: [Stage; 5] = [Stage::Idea, Stage::Mvp, Stage::Launch, Stage::Growth, Stage::Scale];

/// Minimum tick before leaving a stage
pub fn phase_threshold(stage: Stage) -> u64 {
    match stage {
        Stage::Idea => 20,
        Stage::Mvp => 50,
        Stage::Launch => 100,
        Stage::Growth => 200,
        Stage::Scale => 500,
        Stage::Exit => u64::MAX,
    }
}

/// A stage change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Previous stage
    pub from: Stage,
    /// New stage
    pub to: Stage,
    /// Tick of the change
    pub tick: u64,
}

/// Tracks the venture's current stage
#[derive(Debug, Clone)]
pub struct PhaseManager {
    current: Stage,
}

impl PhaseManager {
    /// Start from the venture's configured stage
    pub fn new(stage: Stage) -> Self {
        Self { current: stage }
    }

    /// Current stage
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Advance one stage when `tick` has passed the current stage's
    /// threshold and adoption exceeds `0.1 * (index + 1)`.
    ///
    /// Scale and exit are terminal.
    pub fn check_transition(&mut self, tick: u64, adoption: f64) -> Option<PhaseTransition> {
        let idx = PHASES.iter().position(|s| *s == self.current)?;
        let next = *PHASES.get(idx + 1)?;
        if tick >= phase_threshold(self.current) && adoption > 0.1 * (idx as f64 + 1.0) {
            let transition = PhaseTransition {
                from: self.current,
                to: next,
                tick,
            };
            self.current = next;
            tracing::info!(from = %transition.from, to = %transition.to, tick, "Phase transition");
            return Some(transition);
        }
        None
    }
}
