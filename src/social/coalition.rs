//! Threshold flood-fill clustering over alliance edges.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::relationships::{RelationType, RelationshipGraph};

/// A named cluster of allied actors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coalition {
    /// Display name
    pub name: String,
    /// Member actor ids, sorted
    pub members: BTreeSet<String>,
    /// Mean pairwise edge strength within the cluster
    pub strength: f64,
}

/// Detects coalitions and keeps the latest result
#[derive(Debug, Clone)]
pub struct CoalitionDetector {
    threshold: f64,
    coalitions: Vec<Coalition>,
}

impl CoalitionDetector {
    /// Detector with an alliance strength threshold
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            coalitions: Vec::new(),
        }
    }

    /// Alliance threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Latest detected coalitions
    pub fn coalitions(&self) -> &[Coalition] {
        &self.coalitions
    }

    /// Replace the stored coalitions (checkpoint restore)
    pub fn restore(&mut self, coalitions: Vec<Coalition>) {
        self.coalitions = coalitions;
    }

    fn allied(&self, graph: &RelationshipGraph, a: &str, b: &str) -> bool {
        let strong = |from: &str, to: &str| {
            let rel = graph.get_relationship(from, to);
            rel.kind == RelationType::Alliance && rel.strength >= self.threshold
        };
        strong(a, b) || strong(b, a)
    }

    /// Recompute coalitions over `roster`, fully replacing the previous set.
    ///
    /// Actors outside the roster never appear in a coalition; the result
    /// depends only on the graph and the roster order.
    pub fn detect(&mut self, graph: &RelationshipGraph, roster: &[String]) -> &[Coalition] {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut found = Vec::new();

        for start in roster {
            if visited.contains(start.as_str()) {
                continue;
            }
            let mut cluster = BTreeSet::new();
            let mut frontier = vec![start.as_str()];
            visited.insert(start);
            while let Some(current) = frontier.pop() {
                cluster.insert(current.to_string());
                for other in roster {
                    if !visited.contains(other.as_str()) && self.allied(graph, current, other) {
                        visited.insert(other);
                        frontier.push(other);
                    }
                }
            }
            if cluster.len() >= 2 {
                let strength = mean_pairwise_strength(graph, &cluster);
                found.push(Coalition {
                    name: format!("Coalition-{}", found.len() + 1),
                    members: cluster,
                    strength,
                });
            }
        }

        tracing::debug!(count = found.len(), "Detected coalitions");
        self.coalitions = found;
        &self.coalitions
    }
}

fn mean_pairwise_strength(graph: &RelationshipGraph, members: &BTreeSet<String>) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for a in members {
        for b in members {
            if a != b {
                total += graph.get_relationship(a, b).strength;
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ally(g: &mut RelationshipGraph, a: &str, b: &str, times: usize) {
        for _ in 0..times {
            g.update_from_interaction(a, b, "partner");
        }
    }

    #[test]
    fn test_chain_forms_one_coalition() {
        let mut g = RelationshipGraph::new();
        ally(&mut g, "a", "b", 4);
        ally(&mut g, "c", "b", 4);
        ally(&mut g, "d", "e", 1);

        let mut detector = CoalitionDetector::new(0.3);
        let found = detector.detect(&g, &roster(&["a", "b", "c", "d", "e"])).to_vec();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Coalition-1");
        assert_eq!(
            found[0].members,
            ["a", "b", "c"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert!(found[0].strength > 0.0);
    }

    #[test]
    fn test_idempotent_and_isolated() {
        let mut g = RelationshipGraph::new();
        ally(&mut g, "a", "b", 5);
        ally(&mut g, "x", "y", 5);
        let ids = roster(&["a", "b", "x", "y", "loner"]);

        let mut detector = CoalitionDetector::new(0.3);
        let first = detector.detect(&g, &ids).to_vec();
        let second = detector.detect(&g, &ids).to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|c| !c.members.contains("loner")));
    }

    #[test]
    fn test_members_limited_to_roster() {
        let mut g = RelationshipGraph::new();
        ally(&mut g, "a", "system", 10);
        ally(&mut g, "b", "system", 10);
        let mut detector = CoalitionDetector::new(0.3);
        assert!(detector.detect(&g, &roster(&["a", "b"])).is_empty());
    }

    #[test]
    fn test_rivalry_does_not_connect() {
        let mut g = RelationshipGraph::new();
        for _ in 0..5 {
            g.update_from_interaction("a", "b", "compete");
        }
        let mut detector = CoalitionDetector::new(0.3);
        assert!(detector.detect(&g, &roster(&["a", "b"])).is_empty());
    }
}
