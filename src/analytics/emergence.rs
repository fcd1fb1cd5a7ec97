//! Sliding-window anomaly detection over action types.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;

/// Action history retained for checkpoints beyond the two comparison windows
pub const HISTORY_TAIL: usize = 100;

/// Flags retained for checkpoints
pub const FLAG_TAIL: usize = 50;

/// Flag severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Needs attention
    Warning,
}

/// Kind of anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// One action dominates the window
    ActionDominance,
    /// Too few distinct actions in the window
    DiversityCollapse,
    /// The most common action changed sharply between windows
    BehaviorShift,
}

/// One raised anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceFlag {
    /// Anomaly kind
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    /// Human-readable description
    pub description: String,
    /// Severity
    pub severity: Severity,
    /// Observation count when raised
    pub tick: u64,
}

/// Serializable detector state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergenceState {
    /// Most recent action types
    pub action_history: Vec<String>,
    /// Most recent flags
    pub flags: Vec<EmergenceFlag>,
    /// Total observations
    #[serde(default)]
    pub observed: u64,
}

/// Action counts in first-seen order
fn tally<'a>(actions: impl Iterator<Item = &'a String>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for action in actions {
        match counts.iter_mut().find(|(a, _)| *a == action.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((action.as_str(), 1)),
        }
    }
    counts
}

/// Most common entry; ties go to the first seen
fn top(counts: &[(&str, usize)]) -> Option<(String, usize)> {
    let mut best: Option<(&str, usize)> = None;
    for &(action, n) in counts {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((action, n));
        }
    }
    best.map(|(a, n)| (a.to_string(), n))
}

/// Emergence detector
#[derive(Debug, Clone)]
pub struct EmergenceDetector {
    window: usize,
    dominance_ratio: f64,
    diversity_ratio: f64,
    shift_multiplier: f64,
    history: VecDeque<String>,
    flags: Vec<EmergenceFlag>,
    observed: u64,
}

impl EmergenceDetector {
    /// Detector from analytics thresholds
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            window: config.window_size.max(1),
            dominance_ratio: config.dominance_ratio,
            diversity_ratio: config.diversity_ratio,
            shift_multiplier: config.shift_multiplier,
            history: VecDeque::new(),
            flags: Vec::new(),
            observed: 0,
        }
    }

    /// Window size
    pub fn window(&self) -> usize {
        self.window
    }

    /// Total observations
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// All raised flags
    pub fn flags(&self) -> &[EmergenceFlag] {
        &self.flags
    }

    /// Flags raised at or after `tick`
    pub fn flags_since(&self, tick: u64) -> Vec<EmergenceFlag> {
        self.flags.iter().filter(|f| f.tick >= tick).cloned().collect()
    }

    /// Flags raised within the last window of observations
    pub fn recent_flags(&self) -> Vec<EmergenceFlag> {
        self.flags_since(self.observed.saturating_sub(self.window as u64))
    }

    /// Feed one action type
    pub fn observe(&mut self, action: &str) {
        self.history.push_back(action.to_string());
        self.observed += 1;
        let keep = (self.window * 2).max(HISTORY_TAIL);
        while self.history.len() > keep {
            self.history.pop_front();
        }
        if self.history.len() >= self.window {
            self.check_patterns();
        }
    }

    fn check_patterns(&mut self) {
        let len = self.history.len();
        let window = self.window;
        let recent = tally(self.history.iter().skip(len - window));
        let total = window as f64;
        let mut raised = Vec::new();

        for &(action, count) in &recent {
            let ratio = count as f64 / total;
            if ratio >= self.dominance_ratio {
                raised.push((
                    FlagType::ActionDominance,
                    format!(
                        "Action '{}' dominates at {:.0}% of recent actions",
                        action,
                        ratio * 100.0
                    ),
                    Severity::Warning,
                ));
            }
        }

        if (recent.len() as f64 / total) < self.diversity_ratio {
            raised.push((
                FlagType::DiversityCollapse,
                format!(
                    "Only {} unique actions in last {} steps",
                    recent.len(),
                    window
                ),
                Severity::Warning,
            ));
        }

        if len >= window * 2 {
            let prev = tally(self.history.iter().skip(len - window * 2).take(window));
            if let (Some((prev_top, _)), Some((curr_top, curr_count))) = (top(&prev), top(&recent))
            {
                if prev_top != curr_top {
                    let prev_count = prev
                        .iter()
                        .find(|(a, _)| *a == curr_top)
                        .map_or(0, |(_, n)| *n);
                    let prev_ratio = prev_count as f64 / total;
                    let curr_ratio = curr_count as f64 / total;
                    if curr_ratio > prev_ratio * self.shift_multiplier {
                        raised.push((
                            FlagType::BehaviorShift,
                            format!(
                                "Shift from '{}' to '{}' (was {:.0}%, now {:.0}%)",
                                prev_top,
                                curr_top,
                                prev_ratio * 100.0,
                                curr_ratio * 100.0
                            ),
                            Severity::Info,
                        ));
                    }
                }
            }
        }

        for (flag_type, description, severity) in raised {
            self.flag(flag_type, description, severity);
        }
    }

    fn flag(&mut self, flag_type: FlagType, description: String, severity: Severity) {
        if self.flags.last().map(|f| f.flag_type) == Some(flag_type) {
            return;
        }
        tracing::info!(?severity, %description, "Emergence flag raised");
        self.flags.push(EmergenceFlag {
            flag_type,
            description,
            severity,
            tick: self.observed,
        });
    }

    /// Checkpoint tail of the detector state
    pub fn state(&self) -> EmergenceState {
        let skip_history = self.history.len().saturating_sub(HISTORY_TAIL);
        let skip_flags = self.flags.len().saturating_sub(FLAG_TAIL);
        EmergenceState {
            action_history: self.history.iter().skip(skip_history).cloned().collect(),
            flags: self.flags[skip_flags..].to_vec(),
            observed: self.observed,
        }
    }

    /// Restore from a checkpoint
    pub fn restore(&mut self, state: EmergenceState) {
        self.observed = state.observed.max(state.action_history.len() as u64);
        self.history = state.action_history.into_iter().collect();
        self.flags = state.flags;
    }

    /// Forget all history and flags
    pub fn reset(&mut self) {
        self.history.clear();
        self.flags.clear();
        self.observed = 0;
    }
}
