//! End-to-end economics and social-graph tests.
//!
//! Pure computations over synthetic interaction histories: revenue,
//! adoption, relationship clamping and decay, coalition detection and
//! emergence flags.

use std::collections::HashSet;

use proptest::prelude::*;
use stakesim::analytics::FlagType;
use stakesim::config::AnalyticsConfig;
use stakesim::economics::formulas;
use stakesim::economics::MetricContext;
use stakesim::social::RelationType;
use stakesim::{
    CoalitionDetector, EconomicParams, EmergenceDetector, InteractionLog, MetricSet,
    RelationshipGraph, SimulationEntity, Stage,
};

fn buys(count: usize, span_ticks: u64) -> Vec<InteractionLog> {
    let spacing = span_ticks as f64 / count as f64;
    (0..count)
        .map(|i| {
            InteractionLog::new(
                "sim",
                format!("customer-{}", i % 7),
                "buy",
                "startup",
                i as f64 * spacing,
            )
        })
        .collect()
}

#[test]
fn test_transactional_revenue_is_price_times_buys() {
    let sim = SimulationEntity::new("Acme", "retail", Stage::Launch)
        .with_param("price_per_unit", 100.0)
        .with_param("revenue_model", "transactional");
    let params = EconomicParams::from_simulation(&sim);
    let logs = buys(100, 1000);
    let employees = HashSet::new();

    let metrics = MetricSet::compute(
        &params,
        &logs,
        MetricContext {
            tick: 1000,
            now: 1000.0,
            tick_seconds: 1.0,
            employee_ids: &employees,
        },
    );
    assert_eq!(metrics.revenue, 10_000.0);
    assert!((metrics.monthly_new_customers - 3.0).abs() < 1e-9);
    assert_eq!(metrics.product_quality, 1.0);
}

#[test]
fn test_unknown_revenue_model_falls_back_to_transactional() {
    let sim = SimulationEntity::new("Acme", "retail", Stage::Launch)
        .with_param("revenue_model", "barter");
    let params = EconomicParams::from_simulation(&sim);
    assert!(!params.unit.revenue_model.is_recurring());
}

#[test]
fn test_adoption_increases_up_to_inflection() {
    let params = EconomicParams::default();
    let inflection = params.market.inflection_tick as u64;
    let mut previous = formulas::adoption_rate(&params.market, 0);
    assert!(previous > 0.0);
    for tick in 1..=inflection {
        let rate = formulas::adoption_rate(&params.market, tick);
        assert!(rate > previous, "adoption flat at tick {}", tick);
        previous = rate;
    }
    assert!((previous - 0.5).abs() < 1e-9);
}

#[test]
fn test_churn_is_zero_without_history() {
    assert_eq!(formulas::churn_rate(&[], 100.0, 1.0, 200.0), 0.0);
    let logs = buys(10, 100);
    let churn = formulas::churn_rate(&logs, 100.0, 1.0, 200.0);
    assert!(churn > 0.0 && churn < 1.0);
}

#[test]
fn test_relationship_decay_is_geometric() {
    let mut graph = RelationshipGraph::new();
    for _ in 0..5 {
        graph.update_from_interaction("investor", "startup", "invest");
    }
    let start = graph.get_relationship("investor", "startup").strength;
    assert!((start - 0.5).abs() < 1e-9);

    let factor: f64 = 0.9;
    for _ in 0..12 {
        graph.decay(factor);
    }
    let rel = graph.get_relationship("investor", "startup");
    assert!((rel.strength - start * factor.powi(12)).abs() < 1e-9);
    assert_eq!(rel.kind, RelationType::Alliance);
    assert_eq!(rel.interactions, 5);
}

#[test]
fn test_coalition_excludes_isolated_actor() {
    let mut graph = RelationshipGraph::new();
    for _ in 0..4 {
        graph.update_from_interaction("p1", "p2", "partner");
        graph.update_from_interaction("p2", "p3", "collaborate");
    }
    graph.update_from_interaction("c1", "p1", "wait");
    let roster: Vec<String> = ["p1", "p2", "p3", "c1"].iter().map(|s| s.to_string()).collect();

    let mut detector = CoalitionDetector::new(0.3);
    let first = detector.detect(&graph, &roster).to_vec();
    assert_eq!(first.len(), 1);
    let members: Vec<&str> = first[0].members.iter().map(String::as_str).collect();
    assert_eq!(members, vec!["p1", "p2", "p3"]);

    let again = detector.detect(&graph, &roster).to_vec();
    assert_eq!(first, again);

    // strength is directional, membership is not
    let reversed: Vec<String> = roster.iter().rev().cloned().collect();
    let other = detector.detect(&graph, &reversed).to_vec();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].members, first[0].members);
}

fn cycle(dominant: usize, others: &[&str]) -> Vec<String> {
    let mut window = Vec::with_capacity(dominant + others.len());
    for other in others {
        window.push("buy".to_string());
        window.push(other.to_string());
    }
    window.extend(std::iter::repeat("buy".to_string()).take(dominant - others.len()));
    window
}

#[test]
fn test_dominance_flag_raised_once_at_sixty_percent() {
    let others = ["wait", "recommend", "cancel", "partner", "audit", "advise", "interview", "supply"];
    let window = cycle(12, &others);
    assert_eq!(window.iter().filter(|a| *a == "buy").count(), 12);

    let mut detector = EmergenceDetector::new(&AnalyticsConfig::default());
    for _ in 0..5 {
        for action in &window {
            detector.observe(action);
        }
    }
    let dominance = detector
        .flags()
        .iter()
        .filter(|f| f.flag_type == FlagType::ActionDominance)
        .count();
    assert_eq!(dominance, 1);
    assert_eq!(detector.flags().len(), 1);
}

#[test]
fn test_no_dominance_flag_below_threshold() {
    let others = [
        "wait", "recommend", "cancel", "partner", "audit", "advise", "interview", "supply",
        "build",
    ];
    let window = cycle(11, &others);
    assert_eq!(window.iter().filter(|a| *a == "buy").count(), 11);

    let mut detector = EmergenceDetector::new(&AnalyticsConfig::default());
    for _ in 0..5 {
        for action in &window {
            detector.observe(action);
        }
    }
    assert!(detector.flags().is_empty());
}

proptest! {
    #[test]
    fn prop_strength_stays_clamped(actions in prop::collection::vec(
        prop::sample::select(vec!["invest", "buy", "partner", "compete", "sell", "criticize", "wait"]),
        0..200,
    ), factor in 0.5f64..1.0) {
        let mut graph = RelationshipGraph::new();
        for action in &actions {
            graph.update_from_interaction("a", "b", action);
            graph.decay(factor);
        }
        let strength = graph.get_relationship("a", "b").strength;
        prop_assert!((-1.0..=1.0).contains(&strength));
    }

    #[test]
    fn prop_coalitions_only_contain_roster_members(edges in prop::collection::vec(
        (0usize..6, 0usize..8, 1usize..6),
        0..30,
    )) {
        let ids: Vec<String> = (0..8).map(|i| format!("a{}", i)).collect();
        let roster: Vec<String> = ids[..6].to_vec();
        let mut graph = RelationshipGraph::new();
        for (from, to, repeats) in edges {
            if from == to {
                continue;
            }
            for _ in 0..repeats {
                graph.update_from_interaction(&ids[from], &ids[to], "partner");
            }
        }
        let mut detector = CoalitionDetector::new(0.3);
        let coalitions = detector.detect(&graph, &roster).to_vec();
        let mut seen = HashSet::new();
        for coalition in &coalitions {
            prop_assert!(coalition.members.len() >= 2);
            for member in &coalition.members {
                prop_assert!(roster.contains(member));
                prop_assert!(seen.insert(member.clone()), "actor in two coalitions");
            }
        }
        prop_assert_eq!(detector.detect(&graph, &roster).to_vec(), coalitions);
    }
}
