//! Derived analytics over the interaction stream.
//!
//! - [`EmergenceDetector`]: dominance, diversity collapse and behavior shift
//!   over a sliding window of action types
//! - [`SentimentTracker`]: keyword-lexicon scoring with per-actor moving
//!   averages and trend classification

mod emergence;
mod sentiment;

pub use emergence::{
    EmergenceDetector, EmergenceFlag, EmergenceState, FlagType, Severity, FLAG_TAIL, HISTORY_TAIL,
};
pub use sentiment::{
    score_sentiment, SentimentEntry, SentimentTracker, Trend, CHECKPOINT_TAIL, NEGATIVE_KEYWORDS,
    POSITIVE_KEYWORDS,
};
