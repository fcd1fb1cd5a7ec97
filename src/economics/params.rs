//! Economic coefficients read from a simulation's parameter map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::model::SimulationEntity;

/// How purchases turn into revenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueModel {
    /// One-off purchases: price x buys
    Transactional,
    /// Recurring: price x months active per subscriber
    Subscription,
    /// Accounted like a subscription
    Freemium,
}

impl RevenueModel {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueModel::Transactional => "transactional",
            RevenueModel::Subscription => "subscription",
            RevenueModel::Freemium => "freemium",
        }
    }

    /// Whether revenue accrues per active month
    pub fn is_recurring(&self) -> bool {
        !matches!(self, RevenueModel::Transactional)
    }
}

impl fmt::Display for RevenueModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevenueModel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transactional" => Ok(RevenueModel::Transactional),
            "subscription" => Ok(RevenueModel::Subscription),
            "freemium" => Ok(RevenueModel::Freemium),
            other => Err(SimError::Config(format!("Unknown revenue model: {}", other))),
        }
    }
}

/// Adoption, churn and competition coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Word-of-mouth coefficient
    pub viral_coefficient: f64,
    /// Trial-to-customer conversion
    pub conversion_rate: f64,
    /// Tick at which adoption reaches 50%
    pub inflection_tick: f64,
    /// Ticks until half a cohort has churned
    pub retention_half_life: f64,
    /// Number of competitors
    pub competitor_count: f64,
    /// Their average quality
    pub competitor_quality_avg: f64,
    /// Saturation/dominance damping of adoption steepness
    pub growth_modifier: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            viral_coefficient: 0.1,
            conversion_rate: 0.05,
            inflection_tick: 100.0,
            retention_half_life: 200.0,
            competitor_count: 3.0,
            competitor_quality_avg: 0.5,
            growth_modifier: 1.0,
        }
    }
}

/// Price and cost structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEconomics {
    /// Price per unit or per month
    pub price_per_unit: f64,
    /// Revenue accounting
    pub revenue_model: RevenueModel,
    /// Customer acquisition cost
    pub cac: f64,
    /// Gross margin in [0, 1]
    pub gross_margin: f64,
    /// Operating cost as a share of revenue
    pub opex_ratio: f64,
    /// Fixed monthly cost
    pub base_opex: f64,
}

impl Default for UnitEconomics {
    fn default() -> Self {
        Self {
            price_per_unit: 100.0,
            revenue_model: RevenueModel::Transactional,
            cac: 50.0,
            gross_margin: 0.7,
            opex_ratio: 0.5,
            base_opex: 5000.0,
        }
    }
}

/// Cash position and projected growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingState {
    /// Starting cash
    pub initial_capital: f64,
    /// Monthly revenue growth used in runway projection
    pub revenue_growth_rate: f64,
    /// Monthly burn growth used in runway projection
    pub burn_growth_rate: f64,
}

impl Default for FundingState {
    fn default() -> Self {
        Self {
            initial_capital: 500_000.0,
            revenue_growth_rate: 0.05,
            burn_growth_rate: 0.02,
        }
    }
}

/// All economic coefficients of one simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicParams {
    /// Market coefficients
    pub market: MarketParams,
    /// Unit economics
    pub unit: UnitEconomics,
    /// Funding
    pub funding: FundingState,
}

impl EconomicParams {
    /// Read coefficients from the simulation's parameter map, with defaults.
    ///
    /// An unknown `revenue_model` falls back to transactional.
    pub fn from_simulation(sim: &SimulationEntity) -> Self {
        let d = Self::default();
        let revenue_model = sim
            .param_str("revenue_model", d.unit.revenue_model.as_str())
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to transactional revenue");
                RevenueModel::Transactional
            });
        Self {
            market: MarketParams {
                viral_coefficient: sim.param_f64("viral_coefficient", d.market.viral_coefficient),
                conversion_rate: sim.param_f64("conversion_rate", d.market.conversion_rate),
                inflection_tick: sim.param_f64("inflection_tick", d.market.inflection_tick),
                retention_half_life: sim
                    .param_f64("retention_half_life", d.market.retention_half_life),
                competitor_count: sim.param_f64("competitor_count", d.market.competitor_count),
                competitor_quality_avg: sim
                    .param_f64("competitor_quality_avg", d.market.competitor_quality_avg),
                growth_modifier: sim.param_f64("growth_modifier", d.market.growth_modifier),
            },
            unit: UnitEconomics {
                price_per_unit: sim.param_f64("price_per_unit", d.unit.price_per_unit),
                revenue_model,
                cac: sim.param_f64("cac", d.unit.cac),
                gross_margin: sim.param_f64("gross_margin", d.unit.gross_margin),
                opex_ratio: sim.param_f64("opex_ratio", d.unit.opex_ratio),
                base_opex: sim.param_f64("base_opex", d.unit.base_opex),
            },
            funding: FundingState {
                initial_capital: sim.param_f64("initial_capital", d.funding.initial_capital),
                revenue_growth_rate: sim
                    .param_f64("revenue_growth_rate", d.funding.revenue_growth_rate),
                burn_growth_rate: sim.param_f64("burn_growth_rate", d.funding.burn_growth_rate),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;

    #[test]
    fn test_defaults_when_unset() {
        let sim = SimulationEntity::new("Acme", "saas", Stage::Mvp);
        assert_eq!(EconomicParams::from_simulation(&sim), EconomicParams::default());
    }

    #[test]
    fn test_overrides() {
        let sim = SimulationEntity::new("Acme", "saas", Stage::Mvp)
            .with_param("price_per_unit", 25.0)
            .with_param("revenue_model", "Subscription")
            .with_param("competitor_count", 0);
        let params = EconomicParams::from_simulation(&sim);
        assert_eq!(params.unit.price_per_unit, 25.0);
        assert_eq!(params.unit.revenue_model, RevenueModel::Subscription);
        assert_eq!(params.market.competitor_count, 0.0);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        let sim = SimulationEntity::new("Acme", "saas", Stage::Mvp).with_param("revenue_model", "barter");
        assert_eq!(
            EconomicParams::from_simulation(&sim).unit.revenue_model,
            RevenueModel::Transactional
        );
    }
}
