//! End-of-run report.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::economics::MetricSet;
use crate::error::Result;
use crate::model::{InteractionLog, SimulationEntity, Stage};
use crate::storage::Storage;

/// Actions listed in the report
pub const TOP_ACTIONS: usize = 5;

/// Parameter-map key holding the final outcome
pub const OUTCOME_KEY: &str = "outcome";

/// Parameter-map key holding the final tick count
pub const TICKS_KEY: &str = "tick_count";

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    /// Reached its tick limit, or finalized while still healthy
    Completed,
    /// Stopped on request
    Stopped,
    /// Stopped by the consecutive-failure ceiling
    Failed {
        /// Last failure seen
        reason: String,
    },
}

impl RunOutcome {
    /// Whether the run failed
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Stopped => f.write_str("stopped"),
            RunOutcome::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// Summary of a finished (or inspected) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Simulation id
    pub simulation_id: String,
    /// Venture name
    pub simulation: String,
    /// Industry label
    pub industry: String,
    /// Stage at report time
    pub stage: Stage,
    /// Completed ticks
    pub ticks: u64,
    /// Interactions recorded
    pub total_interactions: usize,
    /// Most frequent actions with counts
    pub top_actions: Vec<(String, usize)>,
    /// Latest metrics
    pub metrics_summary: BTreeMap<String, f64>,
    /// Positive signals
    pub strengths: Vec<String>,
    /// Negative signals
    pub weaknesses: Vec<String>,
    /// One-line verdict
    pub recommendation: String,
    /// How the run ended
    pub outcome: RunOutcome,
}

/// Action counts, most frequent first, ties by name
pub fn top_actions(interactions: &[InteractionLog], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for log in interactions {
        *counts.entry(log.action.as_str()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(action, n)| (action.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

impl RunReport {
    /// Critique a run from its interactions and latest metrics.
    pub fn build(
        simulation: &SimulationEntity,
        interactions: &[InteractionLog],
        metrics: &MetricSet,
        ticks: u64,
        outcome: RunOutcome,
    ) -> Self {
        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        let mut judge = |good: bool, strength: &str, weakness: &str| {
            if good {
                strengths.push(strength.to_string());
            } else {
                weaknesses.push(weakness.to_string());
            }
        };
        judge(
            metrics.adoption_rate > 0.3,
            "Strong early adoption signals",
            "Low adoption rate - product-market fit unclear",
        );
        judge(
            metrics.churn_rate < 0.1,
            "Low churn indicates sticky product",
            "High churn rate needs addressing",
        );
        judge(
            metrics.market_share > 0.05,
            "Meaningful market share captured",
            "Minimal market penetration",
        );
        judge(
            metrics.burn_rate < 50_000.0,
            "Efficient burn rate",
            "Burn rate may be unsustainable",
        );

        let recommendation = if weaknesses.len() > strengths.len() {
            "Proceed with caution"
        } else {
            "Promising trajectory"
        };

        Self {
            simulation_id: simulation.id.clone(),
            simulation: simulation.name.clone(),
            industry: simulation.industry.clone(),
            stage: simulation.stage,
            ticks,
            total_interactions: interactions.len(),
            top_actions: top_actions(interactions, TOP_ACTIONS),
            metrics_summary: metrics.to_map(),
            strengths,
            weaknesses,
            recommendation: recommendation.to_string(),
            outcome,
        }
    }

    /// Rebuild the report of a stored run from its persisted records.
    ///
    /// The latest snapshot of each metric is used. Runs that never
    /// finalized report as completed at their last checkpointed tick.
    pub fn from_storage(storage: &dyn Storage, simulation_id: &str) -> Result<Self> {
        let simulation = storage.get_simulation(simulation_id)?;
        let interactions = storage.get_interactions(simulation_id)?;
        let mut latest = BTreeMap::new();
        for snapshot in storage.get_metrics(simulation_id, None)? {
            latest.insert(snapshot.metric_type, snapshot.value);
        }
        let ticks = match simulation.parameters.get(TICKS_KEY).and_then(|v| v.as_u64()) {
            Some(ticks) => ticks,
            None => storage
                .read_checkpoint(simulation_id)?
                .and_then(|cp| cp.get("tick_count").and_then(|v| v.as_u64()))
                .unwrap_or(0),
        };
        let outcome = simulation
            .parameters
            .get(OUTCOME_KEY)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(RunOutcome::Completed);
        Ok(Self::build(
            &simulation,
            &interactions,
            &MetricSet::from_map(&latest),
            ticks,
            outcome,
        ))
    }

    /// Plain-text rendering for terminals
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} ({}, {} stage)\nOutcome: {}\nTicks: {}  Interactions: {}\n",
            self.simulation,
            self.industry,
            self.stage,
            self.outcome,
            self.ticks,
            self.total_interactions
        );
        if !self.top_actions.is_empty() {
            out.push_str("\nTop actions:\n");
            for (action, count) in &self.top_actions {
                out.push_str(&format!("  {:<16} {}\n", action, count));
            }
        }
        out.push_str("\nMetrics:\n");
        for (name, value) in &self.metrics_summary {
            out.push_str(&format!("  {:<22} {}\n", name, value));
        }
        for (title, items) in [("Strengths", &self.strengths), ("Weaknesses", &self.weaknesses)] {
            if !items.is_empty() {
                out.push_str(&format!("\n{}:\n", title));
                for item in items {
                    out.push_str(&format!("  - {}\n", item));
                }
            }
        }
        out.push_str(&format!("\nRecommendation: {}\n", self.recommendation));
        out
    }
}
