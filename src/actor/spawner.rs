//! Default stakeholder roster for a venture.

use crate::model::{ActorEntity, SimulationEntity, Stage, StakeholderKind};

/// Regulator role by industry keyword, first match wins.
const REGULATORS: &[(&[&str], &str)] = &[
    (&["fintech", "finance"], "Financial Authority (SEC/FCA)"),
    (&["health", "bio"], "Health Authority (FDA)"),
    (&["ai"], "AI Safety Board"),
    (&["crypto", "blockchain"], "Securities Regulator (SEC)"),
    (&["food"], "Food Safety Authority (FDA)"),
    (&["education", "edtech"], "Education Standards Board"),
];

/// Regulator role for an industry
pub fn regulator_role(industry: &str) -> &'static str {
    let industry = industry.to_lowercase();
    REGULATORS
        .iter()
        .find(|(keys, _)| keys.iter().any(|k| industry.contains(k)))
        .map(|(_, role)| *role)
        .unwrap_or("Generic Regulator")
}

fn actor(
    venture: &SimulationEntity,
    kind: StakeholderKind,
    role: &str,
    traits: &[(&str, f64)],
    rules: &[&str],
) -> ActorEntity {
    let mut entity = ActorEntity::new(kind, role)
        .with_knowledge(format!("Knowledge about {}", venture.industry))
        .with_knowledge(format!("Expertise in {}", role));
    for (name, value) in traits {
        entity = entity.with_trait(name, *value);
    }
    for rule in rules {
        entity = entity.with_rule(*rule);
    }
    entity
}

/// Build the initial roster for a venture.
///
/// Three customer segments, an incumbent competitor, a stage-dependent
/// investor, an industry-specific regulator and one of each remaining kind.
pub fn default_roster(venture: &SimulationEntity) -> Vec<ActorEntity> {
    let mut roster = vec![
        actor(
            venture,
            StakeholderKind::Customer,
            "Early Adopter",
            &[("openness", 0.9), ("skepticism", 0.2)],
            &["Evaluate product based on innovation", "Provide honest feedback"],
        )
        .with_trait("segment", "early_adopter"),
        actor(
            venture,
            StakeholderKind::Customer,
            "Mainstream User",
            &[("openness", 0.4), ("skepticism", 0.6)],
            &["Require proven value", "Price sensitive", "Compare alternatives"],
        )
        .with_trait("segment", "mainstream"),
        actor(
            venture,
            StakeholderKind::Customer,
            "Late Majority",
            &[("openness", 0.2), ("skepticism", 0.8)],
            &["Resist change", "Only adopt when necessary", "Demand simplicity"],
        )
        .with_trait("segment", "laggard"),
        actor(
            venture,
            StakeholderKind::Competitor,
            "Incumbent",
            &[("aggression", 0.6), ("adaptability", 0.3)],
            &["Monitor market for new entrants", "Protect market share"],
        ),
    ];

    let investor = match venture.stage {
        Stage::Mvp => Some(("Angel Investor", 0.7)),
        Stage::Launch | Stage::Growth => Some(("VC Partner", 0.4)),
        _ => None,
    };
    if let Some((role, risk)) = investor {
        roster.push(actor(
            venture,
            StakeholderKind::Investor,
            role,
            &[("risk_tolerance", risk)],
            &["Seek high ROI", "Evaluate team and traction"],
        ));
    }

    roster.extend([
        actor(
            venture,
            StakeholderKind::Regulator,
            regulator_role(&venture.industry),
            &[("strictness", 0.8)],
            &["Enforce compliance", "Monitor for violations"],
        ),
        actor(
            venture,
            StakeholderKind::Critic,
            "Tech Blogger",
            &[("cynicism", 0.8), ("detail_oriented", 0.9)],
            &["Find flaws", "Question viability"],
        ),
        actor(
            venture,
            StakeholderKind::Employee,
            "Lead Engineer",
            &[("morale", 0.7), ("productivity", 0.8), ("loyalty", 0.6)],
            &["Build the product", "Flag technical debt", "Consider work-life balance"],
        ),
        actor(
            venture,
            StakeholderKind::Partner,
            "Integration Partner",
            &[("collaboration", 0.7), ("mutual_benefit", 0.8)],
            &["Seek synergies", "Protect own interests", "Evaluate integration effort"],
        ),
        actor(
            venture,
            StakeholderKind::Media,
            "Tech Journalist",
            &[("curiosity", 0.8), ("reach", 0.7), ("sensationalism", 0.4)],
            &["Cover newsworthy developments", "Seek exclusive stories", "Balance objectivity"],
        ),
        actor(
            venture,
            StakeholderKind::Supplier,
            "Cloud Provider",
            &[("reliability", 0.9), ("pricing_flexibility", 0.3)],
            &["Negotiate contracts", "Ensure SLA compliance", "Upsell services"],
        ),
        actor(
            venture,
            StakeholderKind::Advisor,
            "Startup Mentor",
            &[("experience", 0.9), ("empathy", 0.7), ("network", 0.8)],
            &["Share relevant experience", "Provide warm intros", "Challenge assumptions gently"],
        ),
    ]);

    roster
}
