//! Simulation and actor entities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{new_id, unix_now};

/// Free-form parameter map (model coefficients and checkpoint payloads).
pub type Parameters = Map<String, Value>;

/// Lifecycle stage of the simulated venture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Concept only
    Idea,
    /// Minimum viable product
    Mvp,
    /// Public launch
    Launch,
    /// Growth phase
    Growth,
    /// Scaling phase
    Scale,
    /// Acquired, listed or wound down
    Exit,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Stage; 6] = [
        Stage::Idea,
        Stage::Mvp,
        Stage::Launch,
        Stage::Growth,
        Stage::Scale,
        Stage::Exit,
    ];

    /// Lowercase stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Mvp => "mvp",
            Self::Launch => "launch",
            Self::Growth => "growth",
            Self::Scale => "scale",
            Self::Exit => "exit",
        }
    }

    /// The following stage, if any.
    pub fn next(&self) -> Option<Stage> {
        let idx = Self::ALL.iter().position(|s| s == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|stage| stage.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| format!("Unknown stage: {}", s))
    }
}

/// Stakeholder category of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeholderKind {
    /// Buys (or cancels) the product
    Customer,
    /// Competes for market share
    Competitor,
    /// Provides capital
    Investor,
    /// Enforces compliance
    Regulator,
    /// Builds the product
    Employee,
    /// Integrates or co-sells
    Partner,
    /// Publicly critiques
    Critic,
    /// Reports on developments
    Media,
    /// Supplies infrastructure or goods
    Supplier,
    /// Mentors the founders
    Advisor,
}

impl StakeholderKind {
    /// All stakeholder categories.
    pub const ALL: [StakeholderKind; 10] = [
        Self::Customer,
        Self::Competitor,
        Self::Investor,
        Self::Regulator,
        Self::Employee,
        Self::Partner,
        Self::Critic,
        Self::Media,
        Self::Supplier,
        Self::Advisor,
    ];

    /// Lowercase category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Competitor => "competitor",
            Self::Investor => "investor",
            Self::Regulator => "regulator",
            Self::Employee => "employee",
            Self::Partner => "partner",
            Self::Critic => "critic",
            Self::Media => "media",
            Self::Supplier => "supplier",
            Self::Advisor => "advisor",
        }
    }
}

impl fmt::Display for StakeholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StakeholderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| format!("Unknown stakeholder kind: {}", s))
    }
}

/// Configuration and persisted state of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEntity {
    /// Simulation ID
    pub id: String,
    /// Venture name
    pub name: String,
    /// Short description of the venture
    #[serde(default)]
    pub description: String,
    /// Industry label (drives regulator choice and prompts)
    pub industry: String,
    /// Current lifecycle stage
    pub stage: Stage,
    /// Tunable coefficients and checkpoint payload
    #[serde(default)]
    pub parameters: Parameters,
    /// Creation time (unix seconds), also the virtual clock origin
    pub created_at: f64,
}

impl SimulationEntity {
    /// Create a new simulation with a fresh id and empty parameters
    pub fn new(name: impl Into<String>, industry: impl Into<String>, stage: Stage) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            industry: industry.into(),
            stage,
            parameters: Parameters::new(),
            created_at: unix_now(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set a parameter value
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Set the creation time (virtual clock origin)
    pub fn with_created_at(mut self, created_at: f64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Numeric parameter, falling back to `default` when absent or not a number.
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.parameters
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// String parameter, falling back to `default`.
    pub fn param_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }
}

/// A stakeholder actor taking part in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEntity {
    /// Actor ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Stakeholder category
    pub kind: StakeholderKind,
    /// Role label (e.g. "Early Adopter")
    pub role: String,
    /// Personality traits
    #[serde(default)]
    pub personality: Map<String, Value>,
    /// Knowledge tags
    #[serde(default)]
    pub knowledge: Vec<String>,
    /// Behavior rules
    #[serde(default)]
    pub behavior_rules: Vec<String>,
}

impl ActorEntity {
    /// Create an actor with a fresh id; the name defaults to "Role (Kind)".
    pub fn new(kind: StakeholderKind, role: impl Into<String>) -> Self {
        let role = role.into();
        let mut label = kind.as_str().to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        Self {
            id: new_id(),
            name: format!("{} ({})", role, label),
            kind,
            role,
            personality: Map::new(),
            knowledge: Vec::new(),
            behavior_rules: Vec::new(),
        }
    }

    /// Use a fixed id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Add a personality trait
    pub fn with_trait(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.personality.insert(name.to_string(), value.into());
        self
    }

    /// Add a knowledge tag
    pub fn with_knowledge(mut self, tag: impl Into<String>) -> Self {
        self.knowledge.push(tag.into());
        self
    }

    /// Add a behavior rule
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.behavior_rules.push(rule.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_parse() {
        assert_eq!(Stage::Idea.next(), Some(Stage::Mvp));
        assert_eq!(Stage::Exit.next(), None);
        assert_eq!("GROWTH".parse::<Stage>().unwrap(), Stage::Growth);
        assert!("series-b".parse::<Stage>().is_err());
    }

    #[test]
    fn test_stage_serde_lowercase() {
        let json = serde_json::to_string(&Stage::Mvp).unwrap();
        assert_eq!(json, "\"mvp\"");
    }

    #[test]
    fn test_actor_default_name() {
        let actor = ActorEntity::new(StakeholderKind::Investor, "Angel Investor");
        assert_eq!(actor.name, "Angel Investor (Investor)");
        assert!(!actor.id.is_empty());
    }

    #[test]
    fn test_param_accessors() {
        let sim = SimulationEntity::new("Acme", "fintech", Stage::Mvp)
            .with_param("price_per_unit", 42.0)
            .with_param("revenue_model", "subscription");
        assert_eq!(sim.param_f64("price_per_unit", 100.0), 42.0);
        assert_eq!(sim.param_f64("missing", 7.0), 7.0);
        assert_eq!(sim.param_str("revenue_model", "transactional"), "subscription");
    }
}
