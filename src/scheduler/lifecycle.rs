//! Scheduler lifecycle and its transition table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Constructed, not yet started
    Idle,
    /// Processing ticks
    Running,
    /// Started, but ticks are suspended
    Paused,
    /// Terminal
    Stopped,
}

/// Requested lifecycle change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    /// idle -> running
    Start,
    /// running -> paused
    Pause,
    /// paused -> running
    Resume,
    /// any -> stopped
    Stop,
}

impl Lifecycle {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Running => "running",
            Lifecycle::Paused => "paused",
            Lifecycle::Stopped => "stopped",
        }
    }

    /// Whether ticks are processed in this state
    pub fn is_running(&self) -> bool {
        matches!(self, Lifecycle::Running)
    }

    /// Whether the state is terminal
    pub fn is_stopped(&self) -> bool {
        matches!(self, Lifecycle::Stopped)
    }

    /// Apply an action, rejecting transitions outside the table.
    ///
    /// | from \ action | start | pause | resume | stop |
    /// |---------------|-------|-------|--------|------|
    /// | idle          | running | - | - | stopped |
    /// | running       | - | paused | - | stopped |
    /// | paused        | - | - | running | stopped |
    /// | stopped       | - | - | - | stopped |
    pub fn transition(self, action: LifecycleAction) -> Result<Lifecycle> {
        use Lifecycle::*;
        use LifecycleAction::*;
        match (self, action) {
            (Idle, Start) => Ok(Running),
            (Running, Pause) => Ok(Paused),
            (Paused, Resume) => Ok(Running),
            (_, Stop) => Ok(Stopped),
            (from, action) => Err(SimError::InvalidTransition {
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Pause => "pause",
            LifecycleAction::Resume => "resume",
            LifecycleAction::Stop => "stop",
        })
    }
}
