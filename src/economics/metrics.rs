//! The metric set produced each metrics cycle.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::formulas;
use super::modifiers::seasonal_multiplier;
use super::params::EconomicParams;
use crate::model::{InteractionLog, MetricSnapshot};

/// Inputs that come from the scheduler rather than the log
#[derive(Debug, Clone, Copy)]
pub struct MetricContext<'a> {
    /// Completed ticks
    pub tick: u64,
    /// Virtual clock
    pub now: f64,
    /// Virtual seconds per tick
    pub tick_seconds: f64,
    /// Actors whose complaints count as morale incidents
    pub employee_ids: &'a HashSet<String>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}

/// Business metrics for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    /// S-curve adoption
    pub adoption_rate: f64,
    /// Cohort churn
    pub churn_rate: f64,
    /// Relative-quality market share
    pub market_share: f64,
    /// Positive interaction share
    pub product_quality: f64,
    /// Cumulative revenue
    pub revenue: f64,
    /// Revenue this month
    pub monthly_revenue: f64,
    /// New customers per month
    pub monthly_new_customers: f64,
    /// Monthly burn
    pub burn_rate: f64,
    /// Projected months of cash
    pub runway_months: f64,
}

impl MetricSet {
    /// Recompute every metric from the full interaction history, then apply
    /// the quarter's seasonal multipliers to adoption and burn.
    pub fn compute(
        params: &EconomicParams,
        interactions: &[InteractionLog],
        ctx: MetricContext<'_>,
    ) -> Self {
        let adoption_rate = formulas::adoption_rate(&params.market, ctx.tick);
        let churn_rate = formulas::churn_rate(
            interactions,
            ctx.now,
            ctx.tick_seconds,
            params.market.retention_half_life,
        );
        let product_quality = formulas::product_quality(interactions);
        let market_share = formulas::market_share(product_quality, &params.market);
        let revenue = formulas::revenue(interactions, ctx.tick, ctx.now, ctx.tick_seconds, &params.unit);
        let incidents = formulas::morale_incidents(interactions, ctx.employee_ids);
        let burn_rate = formulas::burn_rate(
            &params.unit,
            revenue.monthly_revenue,
            revenue.monthly_new_customers,
            incidents,
        );
        let runway_months = formulas::runway_months(
            &params.funding,
            burn_rate,
            revenue.monthly_revenue,
            revenue.cumulative_revenue,
            ctx.tick,
        );

        let seasonal = seasonal_multiplier(ctx.tick);
        Self {
            adoption_rate: round_to(
                (adoption_rate * seasonal.adoption_rate).clamp(0.0, 1.0),
                4,
            ),
            churn_rate: round_to(churn_rate, 4),
            market_share: round_to(market_share, 4),
            product_quality: round_to(product_quality, 4),
            revenue: round_to(revenue.cumulative_revenue, 2),
            monthly_revenue: round_to(revenue.monthly_revenue, 2),
            monthly_new_customers: round_to(revenue.monthly_new_customers, 4),
            burn_rate: round_to(burn_rate * seasonal.burn_rate, 2),
            runway_months: round_to(runway_months, 1),
        }
    }

    /// Name/value pairs in a stable order
    pub fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("adoption_rate", self.adoption_rate),
            ("churn_rate", self.churn_rate),
            ("market_share", self.market_share),
            ("product_quality", self.product_quality),
            ("revenue", self.revenue),
            ("monthly_revenue", self.monthly_revenue),
            ("monthly_new_customers", self.monthly_new_customers),
            ("burn_rate", self.burn_rate),
            ("runway_months", self.runway_months),
        ]
    }

    /// Rebuild from stored name/value pairs; missing metrics read as zero
    pub fn from_map(values: &BTreeMap<String, f64>) -> Self {
        let get = |name: &str| values.get(name).copied().unwrap_or(0.0);
        Self {
            adoption_rate: get("adoption_rate"),
            churn_rate: get("churn_rate"),
            market_share: get("market_share"),
            product_quality: get("product_quality"),
            revenue: get("revenue"),
            monthly_revenue: get("monthly_revenue"),
            monthly_new_customers: get("monthly_new_customers"),
            burn_rate: get("burn_rate"),
            runway_months: get("runway_months"),
        }
    }

    /// Metrics keyed by name
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries()
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    /// One snapshot record per metric
    pub fn snapshots(&self, simulation_id: &str, timestamp: f64) -> Vec<MetricSnapshot> {
        self.entries()
            .iter()
            .map(|(k, v)| MetricSnapshot::new(simulation_id, *k, *v, timestamp))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SimulationEntity, Stage};

    #[test]
    fn test_compute_applies_seasonal_adoption() {
        let params = EconomicParams::default();
        let employees = HashSet::new();
        let ctx = MetricContext {
            tick: 100,
            now: 100.0,
            tick_seconds: 1.0,
            employee_ids: &employees,
        };
        let m = MetricSet::compute(&params, &[], ctx);
        // quarter 2 (ticks 90..180) multiplies adoption by 1.1
        assert_eq!(m.adoption_rate, 0.55);
        assert_eq!(m.product_quality, 0.5);
        assert_eq!(m.revenue, 0.0);
        assert_eq!(m.burn_rate, 5000.0);
    }

    #[test]
    fn test_boosted_quarter_keeps_adoption_a_rate() {
        let params = EconomicParams::default();
        let employees = HashSet::new();
        // tick 1000 is in a year-end quarter, long past the inflection point
        let ctx = MetricContext {
            tick: 1000,
            now: 1000.0,
            tick_seconds: 1.0,
            employee_ids: &employees,
        };
        let m = MetricSet::compute(&params, &[], ctx);
        assert_eq!(m.adoption_rate, 1.0);
    }

    #[test]
    fn test_transactional_revenue_from_buys() {
        let sim = SimulationEntity::new("Acme", "saas", Stage::Launch).with_param("price_per_unit", 100.0);
        let params = EconomicParams::from_simulation(&sim);
        let logs: Vec<InteractionLog> = (0..100)
            .map(|i| InteractionLog::new(&sim.id, "c1", "buy", "startup", (i * 10) as f64))
            .collect();
        let employees = HashSet::new();
        let ctx = MetricContext {
            tick: 1000,
            now: 1000.0,
            tick_seconds: 1.0,
            employee_ids: &employees,
        };
        let m = MetricSet::compute(&params, &logs, ctx);
        assert_eq!(m.revenue, 10_000.0);
        assert_eq!(m.monthly_new_customers, 3.0);
        assert_eq!(m.to_map().len(), 9);
        assert_eq!(m.snapshots(&sim.id, 1000.0)[4].metric_type, "revenue");
    }
}
