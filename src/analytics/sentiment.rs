//! Lexicon-based sentiment per actor.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;

/// Words counted as positive
pub const POSITIVE_KEYWORDS: &[&str] = &[
    "buy", "invest", "partner", "collaborate", "love", "great", "excellent", "recommend",
    "approve", "support", "innovative", "promising",
];

/// Words counted as negative
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "complain", "sell", "criticize", "reject", "hate", "terrible", "fail", "overpriced",
    "refuse", "lawsuit", "violation", "risk",
];

/// Entries kept per actor in checkpoints
pub const CHECKPOINT_TAIL: usize = 50;

/// Score text in [-1, 1]: (positive - negative) / (positive + negative)
/// over distinct whitespace-separated words, 0 when nothing matches.
pub fn score_sentiment(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let words: HashSet<&str> = lower.split_whitespace().collect();
    let pos = POSITIVE_KEYWORDS.iter().filter(|k| words.contains(*k)).count();
    let neg = NEGATIVE_KEYWORDS.iter().filter(|k| words.contains(*k)).count();
    let total = pos + neg;
    if total == 0 {
        0.0
    } else {
        (pos as f64 - neg as f64) / total as f64
    }
}

/// Direction of recent sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Second half of the window is clearly more positive
    Rising,
    /// Second half of the window is clearly more negative
    Falling,
    /// Neither
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        })
    }
}

/// One scored observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentEntry {
    /// Virtual time
    pub timestamp: f64,
    /// Score in [-1, 1]
    pub score: f64,
}

/// Bounded per-actor sentiment history
#[derive(Debug, Clone)]
pub struct SentimentTracker {
    history: BTreeMap<String, Vec<SentimentEntry>>,
    limit: usize,
    window: usize,
    trend_delta: f64,
}

impl SentimentTracker {
    /// Tracker from analytics thresholds
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            history: BTreeMap::new(),
            limit: config.history_limit.max(1),
            window: config.window.max(1),
            trend_delta: config.trend_delta,
        }
    }

    /// Score and record free text
    pub fn record(&mut self, actor_id: &str, text: &str, timestamp: f64) {
        let score = score_sentiment(text);
        let entries = self.history.entry(actor_id.to_string()).or_default();
        entries.push(SentimentEntry { timestamp, score });
        if entries.len() > self.limit {
            let excess = entries.len() - self.limit;
            entries.drain(..excess);
        }
    }

    /// Record an action together with its outcome text
    pub fn record_action(&mut self, actor_id: &str, action: &str, outcome: &str, timestamp: f64) {
        self.record(actor_id, &format!("{} {}", action, outcome), timestamp);
    }

    fn recent(&self, actor_id: &str) -> &[SentimentEntry] {
        let entries = self.history.get(actor_id).map(Vec::as_slice).unwrap_or(&[]);
        &entries[entries.len().saturating_sub(self.window)..]
    }

    /// Moving average over the window, 0 for unknown actors
    pub fn sentiment(&self, actor_id: &str) -> f64 {
        let recent = self.recent(actor_id);
        if recent.is_empty() {
            return 0.0;
        }
        recent.iter().map(|e| e.score).sum::<f64>() / recent.len() as f64
    }

    /// First-half vs second-half comparison over the window
    pub fn trend(&self, actor_id: &str) -> Trend {
        if self.history.get(actor_id).map_or(0, Vec::len) < 4 {
            return Trend::Stable;
        }
        let recent = self.recent(actor_id);
        let half = recent.len() / 2;
        let mean = |s: &[SentimentEntry]| {
            s.iter().map(|e| e.score).sum::<f64>() / s.len().max(1) as f64
        };
        let diff = mean(&recent[half..]) - mean(&recent[..half]);
        if diff > self.trend_delta {
            Trend::Rising
        } else if diff < -self.trend_delta {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Moving average for every tracked actor
    pub fn all_sentiments(&self) -> BTreeMap<String, f64> {
        self.history
            .keys()
            .map(|id| (id.clone(), self.sentiment(id)))
            .collect()
    }

    /// Full history of one actor
    pub fn history(&self, actor_id: &str) -> &[SentimentEntry] {
        self.history.get(actor_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checkpoint tail per actor
    pub fn snapshot(&self) -> BTreeMap<String, Vec<SentimentEntry>> {
        self.history
            .iter()
            .map(|(id, entries)| {
                let start = entries.len().saturating_sub(CHECKPOINT_TAIL);
                (id.clone(), entries[start..].to_vec())
            })
            .collect()
    }

    /// Restore from a checkpoint
    pub fn restore(&mut self, history: BTreeMap<String, Vec<SentimentEntry>>) {
        self.history = history;
    }
}
