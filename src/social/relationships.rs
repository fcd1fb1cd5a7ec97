//! Directed, weighted relationship graph between actors.
//!
//! Every interaction nudges the `(actor, target)` edge toward alliance or
//! rivalry depending on the action; every tick all strengths decay
//! multiplicatively toward zero. Strengths stay in `[-1, 1]`.

use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// Actions that strengthen an alliance
pub const ALLIANCE_ACTIONS: &[&str] = &["invest", "buy", "partner", "send_message", "collaborate"];

/// Actions that push toward rivalry
pub const RIVALRY_ACTIONS: &[&str] = &["complain", "compete", "criticize", "sell"];

/// Strength change per classified interaction
pub const STRENGTH_STEP: f64 = 0.1;

/// Relationship category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    /// Cooperative
    Alliance,
    /// Antagonistic
    Rivalry,
    /// One side relies on the other
    Dependency,
    /// No leaning
    Neutral,
}

impl RelationType {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Alliance => "alliance",
            RelationType::Rivalry => "rivalry",
            RelationType::Dependency => "dependency",
            RelationType::Neutral => "neutral",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an action into a relationship type and strength delta
pub fn classify(action: &str) -> (RelationType, f64) {
    if ALLIANCE_ACTIONS.contains(&action) {
        (RelationType::Alliance, STRENGTH_STEP)
    } else if RIVALRY_ACTIONS.contains(&action) {
        (RelationType::Rivalry, -STRENGTH_STEP)
    } else {
        (RelationType::Neutral, 0.0)
    }
}

/// Edge weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Current category
    #[serde(rename = "type")]
    pub kind: RelationType,
    /// Strength in [-1, 1]
    pub strength: f64,
    /// Interactions seen on this edge
    pub interactions: u64,
}

impl Default for Relationship {
    fn default() -> Self {
        Self {
            kind: RelationType::Neutral,
            strength: 0.0,
            interactions: 0,
        }
    }
}

/// Flattened edge, used in checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Source actor
    pub source: String,
    /// Target actor or object
    pub target: String,
    /// Edge data
    #[serde(flatten)]
    pub relationship: Relationship,
}

/// Relationship graph keyed by actor id
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    graph: DiGraph<String, Relationship>,
    nodes: HashMap<String, NodeIndex>,
}

impl RelationshipGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(idx) = self.nodes.get(id) {
            return *idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.nodes.insert(id.to_string(), idx);
        idx
    }

    /// Create or update the `source -> target` edge; strength is clamped.
    pub fn add_or_update(&mut self, source: &str, target: &str, kind: RelationType, delta: f64) {
        let a = self.node(source);
        let b = self.node(target);
        let edge = match self.graph.find_edge(a, b) {
            Some(e) => e,
            None => self.graph.add_edge(a, b, Relationship::default()),
        };
        if let Some(rel) = self.graph.edge_weight_mut(edge) {
            rel.kind = kind;
            rel.strength = (rel.strength + delta).clamp(-1.0, 1.0);
            rel.interactions += 1;
        }
    }

    /// Infer a relationship change from one interaction
    pub fn update_from_interaction(&mut self, actor_id: &str, target: &str, action: &str) {
        let (kind, delta) = classify(action);
        self.add_or_update(actor_id, target, kind, delta);
    }

    /// The `source -> target` edge, neutral if absent
    pub fn get_relationship(&self, source: &str, target: &str) -> Relationship {
        match (self.nodes.get(source), self.nodes.get(target)) {
            (Some(&a), Some(&b)) => self
                .graph
                .find_edge(a, b)
                .and_then(|e| self.graph.edge_weight(e))
                .copied()
                .unwrap_or_default(),
            _ => Relationship::default(),
        }
    }

    fn outgoing(&self, id: &str) -> impl Iterator<Item = (&str, &Relationship)> + '_ {
        self.nodes.get(id).into_iter().flat_map(move |&idx| {
            self.graph
                .edges(idx)
                .map(move |e| (self.graph[e.target()].as_str(), e.weight()))
        })
    }

    /// Targets `id` is allied with at or above `threshold`, sorted
    pub fn allies(&self, id: &str, threshold: f64) -> Vec<String> {
        let mut out: Vec<String> = self
            .outgoing(id)
            .filter(|(_, r)| r.kind == RelationType::Alliance && r.strength >= threshold)
            .map(|(t, _)| t.to_string())
            .collect();
        out.sort();
        out
    }

    /// Targets `id` is rivals with, by magnitude, sorted
    pub fn rivals(&self, id: &str, threshold: f64) -> Vec<String> {
        let mut out: Vec<String> = self
            .outgoing(id)
            .filter(|(_, r)| r.kind == RelationType::Rivalry && r.strength.abs() >= threshold)
            .map(|(t, _)| t.to_string())
            .collect();
        out.sort();
        out
    }

    /// Multiply every strength by `factor`
    pub fn decay(&mut self, factor: f64) {
        for rel in self.graph.edge_weights_mut() {
            rel.strength = (rel.strength * factor).clamp(-1.0, 1.0);
        }
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> Vec<EdgeRecord> {
        self.graph
            .edge_references()
            .map(|e| EdgeRecord {
                source: self.graph[e.source()].clone(),
                target: self.graph[e.target()].clone(),
                relationship: *e.weight(),
            })
            .collect()
    }

    /// Rebuild from checkpointed edges, replacing the current graph
    pub fn restore(&mut self, edges: &[EdgeRecord]) {
        *self = Self::new();
        for record in edges {
            let a = self.node(&record.source);
            let b = self.node(&record.target);
            let mut rel = record.relationship;
            rel.strength = rel.strength.clamp(-1.0, 1.0);
            self.graph.add_edge(a, b, rel);
        }
    }
}
