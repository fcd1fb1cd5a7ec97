//! Bounded actor memory with summarizing eviction.
//!
//! Once the log grows past its capacity the oldest ~30% of entries are
//! collapsed into one summary entry that is placed at the front, so the
//! buffer stays bounded without discarding long-run context entirely. The
//! newest entries are never dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a memory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// Something the actor saw
    Observation,
    /// The actor's own reasoning
    Internal,
    /// A message from another actor
    Message,
    /// A strategy change
    Strategy,
    /// A goal change
    Goal,
    /// A periodic self-reflection
    Reflection,
    /// A collapsed block of older memories
    Summary,
    /// A dialogue or debate the actor took part in
    Social,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Observation => "observation",
            Self::Internal => "internal",
            Self::Message => "message",
            Self::Strategy => "strategy",
            Self::Goal => "goal",
            Self::Reflection => "reflection",
            Self::Summary => "summary",
            Self::Social => "social",
        };
        write!(f, "{}", name)
    }
}

/// One memory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Entry text
    pub content: String,
    /// Entry kind
    pub kind: MemoryKind,
    /// Virtual timestamp
    pub timestamp: f64,
}

impl MemoryEntry {
    /// Create an entry
    pub fn new(kind: MemoryKind, content: impl Into<String>, timestamp: f64) -> Self {
        Self {
            content: content.into(),
            kind,
            timestamp,
        }
    }
}

/// Bounded memory log
#[derive(Debug, Clone)]
pub struct MemoryLog {
    entries: Vec<MemoryEntry>,
    capacity: usize,
    eviction_ratio: f64,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new(capacity: usize, eviction_ratio: f64) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            eviction_ratio: eviction_ratio.clamp(0.0, 1.0),
        }
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the next push would trigger eviction
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Append an entry, evicting with a rule-based summary if over capacity.
    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.capacity {
            let count = self.eviction_count();
            let summary = summarize_rule_based(&self.entries[..count]);
            self.collapse_oldest(count, summary);
        }
    }

    /// Number of oldest entries an eviction collapses.
    ///
    /// At least the configured ratio, and always enough that the log ends up
    /// within capacity after the summary is added.
    pub fn eviction_count(&self) -> usize {
        let len = self.entries.len();
        let by_ratio = (len as f64 * self.eviction_ratio).floor() as usize;
        let needed = (len + 1).saturating_sub(self.capacity);
        by_ratio.max(needed).max(2).min(len)
    }

    /// The oldest `count` entries
    pub fn oldest(&self, count: usize) -> &[MemoryEntry] {
        &self.entries[..count.min(self.entries.len())]
    }

    /// Replace the oldest `count` entries with one summary entry at the front.
    pub fn collapse_oldest(&mut self, count: usize, summary: impl Into<String>) {
        let count = count.min(self.entries.len());
        if count == 0 {
            return;
        }
        let timestamp = self.entries[count - 1].timestamp;
        self.entries.drain(..count);
        self.entries
            .insert(0, MemoryEntry::new(MemoryKind::Summary, summary, timestamp));
    }

    /// The newest `limit` entries rendered one per line
    pub fn render_recent(&self, limit: usize) -> String {
        self.tail(limit)
            .iter()
            .map(|m| format!("[{}] {}", m.kind, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The newest `limit` entries
    pub fn tail(&self, limit: usize) -> &[MemoryEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }

    /// Replace the log contents (checkpoint restore), keeping the newest
    /// entries if the restored set exceeds capacity.
    pub fn restore(&mut self, entries: Vec<MemoryEntry>) {
        let start = entries.len().saturating_sub(self.capacity);
        self.entries = entries.into_iter().skip(start).collect();
    }
}

/// Deterministic summary of a block of memories.
pub fn summarize_rule_based(entries: &[MemoryEntry]) -> String {
    let mut counts: BTreeMap<MemoryKind, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.kind).or_default() += 1;
    }
    let breakdown = counts
        .iter()
        .map(|(kind, n)| format!("{} {}", n, kind))
        .collect::<Vec<_>>()
        .join(", ");
    let mut summary = format!("Summary of {} earlier memories ({}).", entries.len(), breakdown);
    if let Some(last) = entries.last() {
        let excerpt: String = last.content.chars().take(120).collect();
        summary.push_str(&format!(" Most recent: {}", excerpt));
    }
    summary
}
