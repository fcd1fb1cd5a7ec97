//! Economics model.
//!
//! Metrics are pure functions of the interaction history plus the
//! simulation's parameter map, recomputed in full every metrics cycle.
//!
//! | Metric | Model |
//! |--------|-------|
//! | `adoption_rate` | Logistic S-curve, steepness from viral and conversion coefficients |
//! | `churn_rate` | Cohort survival `0.5^(age / half_life)` |
//! | `product_quality` | Positive share of quality-relevant interactions |
//! | `market_share` | Own quality vs. competitor pool |
//! | `revenue` | Transactional or recurring cohort accounting |
//! | `burn_rate` | Fixed + COGS + marketing + variable opex, morale-inflated |
//! | `runway_months` | Month-by-month cash projection, capped |

pub mod formulas;
mod metrics;
mod modifiers;
mod params;
mod phase;

pub use metrics::{MetricContext, MetricSet};
pub use modifiers::{growth_modifier, seasonal_multiplier, Seasonal, TICKS_PER_QUARTER};
pub use params::{EconomicParams, FundingState, MarketParams, RevenueModel, UnitEconomics};
pub use phase::{phase_threshold, PhaseManager, PhaseTransition, PHASES};
