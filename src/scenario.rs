//! Seeded random world events.
//!
//! Each tick rolls, in order, for a crisis, a macro-economic event and a
//! market disruption; at most one fires. Impacts are descriptive and are
//! carried in the world snapshot and the published event; they do not
//! modify computed metrics.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::events::EventKind;

/// Per-tick crisis probability
pub const CRISIS_PROBABILITY: f64 = 0.02;
/// Per-tick macro event probability
pub const MACRO_PROBABILITY: f64 = 0.01;
/// Per-tick disruption probability
pub const DISRUPTION_PROBABILITY: f64 = 0.005;

/// Event family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Venture-specific setback
    Crisis,
    /// Economy-wide shift
    Macro,
    /// Market or technology disruption
    Disruption,
}

impl EventCategory {
    /// Bus event kind used when publishing
    pub fn event_kind(&self) -> EventKind {
        match self {
            EventCategory::Crisis => EventKind::Crisis,
            EventCategory::Macro => EventKind::MacroEvent,
            EventCategory::Disruption => EventKind::Disruption,
        }
    }
}

/// A random world event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Event family
    pub category: EventCategory,
    /// Short name
    pub name: String,
    /// What happened
    pub description: String,
    /// Descriptive metric impact
    pub impact: BTreeMap<String, f64>,
}

type Template = (&'static str, &'static str, &'static [(&'static str, f64)]);

const CRISES: &[Template] = &[
    ("PR Disaster", "Major negative press coverage goes viral", &[("adoption_rate", -0.15), ("market_share", -0.05)]),
    ("Funding Gap", "Key funding round falls through", &[("burn_rate", 1.5)]),
    ("Key Employee Loss", "CTO/key engineer leaves for competitor", &[("adoption_rate", -0.05)]),
    ("Security Breach", "Customer data exposed in security incident", &[("adoption_rate", -0.2), ("churn_rate", 0.1)]),
    ("Regulatory Action", "Regulator issues cease-and-desist", &[("market_share", -0.1)]),
];

const MACRO: &[Template] = &[
    ("Economic Recession", "Broad economic downturn reduces spending", &[("adoption_rate", -0.1), ("burn_rate", 0.8)]),
    ("Economic Boom", "Strong economy increases investment", &[("adoption_rate", 0.1), ("market_share", 0.05)]),
    ("Policy Change", "New regulation affects industry", &[("churn_rate", 0.05)]),
    ("Interest Rate Hike", "Higher rates reduce VC activity", &[("burn_rate", 1.2)]),
];

const DISRUPTIONS: &[Template] = &[
    ("New Platform Launch", "Major tech company launches competing platform", &[("market_share", -0.15)]),
    ("Technology Obsolescence", "Core technology becomes outdated", &[("adoption_rate", -0.2)]),
    ("AI Breakthrough", "New AI capability disrupts market", &[("adoption_rate", 0.1)]),
];

fn instantiate(category: EventCategory, template: &Template) -> WorldEvent {
    let (name, description, impact) = *template;
    WorldEvent {
        category,
        name: name.to_string(),
        description: description.to_string(),
        impact: impact.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

/// Seeded per-tick event roller
#[derive(Debug)]
pub struct EventGenerator {
    rng: StdRng,
    crisis: f64,
    macro_event: f64,
    disruption: f64,
}

impl EventGenerator {
    /// Generator with the default probabilities
    pub fn new(seed: u64) -> Self {
        Self::with_probabilities(seed, CRISIS_PROBABILITY, MACRO_PROBABILITY, DISRUPTION_PROBABILITY)
    }

    /// Generator with custom probabilities
    pub fn with_probabilities(seed: u64, crisis: f64, macro_event: f64, disruption: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            crisis: crisis.clamp(0.0, 1.0),
            macro_event: macro_event.clamp(0.0, 1.0),
            disruption: disruption.clamp(0.0, 1.0),
        }
    }

    /// Roll for this tick's event
    pub fn maybe_trigger(&mut self, tick: u64) -> Option<WorldEvent> {
        let rolls = [
            (EventCategory::Crisis, self.crisis, CRISES),
            (EventCategory::Macro, self.macro_event, MACRO),
            (EventCategory::Disruption, self.disruption, DISRUPTIONS),
        ];
        for (category, probability, catalog) in rolls {
            if self.rng.gen_bool(probability) {
                let event = catalog.choose(&mut self.rng).map(|t| instantiate(category, t))?;
                match category {
                    EventCategory::Crisis => {
                        tracing::warn!(tick, name = %event.name, "Crisis triggered")
                    },
                    _ => tracing::info!(tick, name = %event.name, ?category, "World event"),
                }
                return Some(event);
            }
        }
        None
    }
}
