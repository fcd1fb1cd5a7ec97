//! Pure economic formulas over the interaction history.
//!
//! Every function recomputes from the full log; nothing here is incremental.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::params::{FundingState, MarketParams, UnitEconomics};
use crate::model::InteractionLog;

/// Actions counted as positive product signals
pub const QUALITY_POSITIVE: &[&str] = &["buy", "invest", "partner", "collaborate"];

/// Actions counted as negative product signals
pub const QUALITY_NEGATIVE: &[&str] = &["complain", "sell", "criticize", "ignore"];

/// Employee actions that count as morale incidents
pub const MORALE_ACTIONS: &[&str] = &["complain", "criticize", "resign"];

/// Burn inflation per morale incident
pub const MORALE_PENALTY: f64 = 0.001;

/// Ticks per simulated month
pub const TICKS_PER_MONTH: f64 = 30.0;

/// Longest runway projection, in months
pub const MAX_RUNWAY_MONTHS: u32 = 60;

/// Logistic S-curve `1 / (1 + exp(-k (tick - t0)))`.
///
/// `k = (0.5 viral + 2 conversion) * growth_modifier`.
pub fn adoption_rate(market: &MarketParams, tick: u64) -> f64 {
    let k = (market.viral_coefficient * 0.5 + market.conversion_rate * 2.0) * market.growth_modifier;
    let x = -k * (tick as f64 - market.inflection_tick);
    // exp overflows to +inf, which yields exactly 0.0
    1.0 / (1.0 + x.exp())
}

/// Cohort churn: `1 - mean(0.5^(age / half_life))` over every actor that
/// has interacted, with age in ticks since its first interaction.
pub fn churn_rate(interactions: &[InteractionLog], now: f64, tick_seconds: f64, half_life: f64) -> f64 {
    let mut first_seen: HashMap<&str, f64> = HashMap::new();
    for log in interactions {
        first_seen
            .entry(log.actor_id.as_str())
            .and_modify(|t| *t = t.min(log.timestamp))
            .or_insert(log.timestamp);
    }
    if first_seen.is_empty() || half_life <= 0.0 {
        return 0.0;
    }
    let tick_seconds = if tick_seconds > 0.0 { tick_seconds } else { 1.0 };
    let survival: f64 = first_seen
        .values()
        .map(|start| {
            let age_ticks = ((now - start) / tick_seconds).max(0.0);
            0.5_f64.powf(age_ticks / half_life)
        })
        .sum();
    1.0 - survival / first_seen.len() as f64
}

/// Positive share of quality-relevant interactions, 0.5 with none.
pub fn product_quality(interactions: &[InteractionLog]) -> f64 {
    let positive = interactions
        .iter()
        .filter(|l| QUALITY_POSITIVE.contains(&l.action.as_str()))
        .count();
    let negative = interactions
        .iter()
        .filter(|l| QUALITY_NEGATIVE.contains(&l.action.as_str()))
        .count();
    let relevant = positive + negative;
    if relevant == 0 {
        0.5
    } else {
        positive as f64 / relevant as f64
    }
}

/// Own quality relative to the competitor pool; 1.0 without competitors.
pub fn market_share(quality: f64, market: &MarketParams) -> f64 {
    if market.competitor_count <= 0.0 {
        return 1.0;
    }
    let pool = quality + market.competitor_count * market.competitor_quality_avg;
    if pool > 0.0 {
        quality / pool
    } else {
        0.0
    }
}

/// Revenue figures for one metrics cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueMetrics {
    /// Revenue in the current month
    pub monthly_revenue: f64,
    /// Revenue since the start of the run
    pub cumulative_revenue: f64,
    /// New customers per month
    pub monthly_new_customers: f64,
}

/// Revenue under the configured model.
///
/// Transactional: `price x buys`. Recurring: each `buy` accrues price per
/// month since purchase and each `sell`/`cancel` subtracts price per month
/// since cancellation, floored at zero.
pub fn revenue(
    interactions: &[InteractionLog],
    tick: u64,
    now: f64,
    tick_seconds: f64,
    unit: &UnitEconomics,
) -> RevenueMetrics {
    let buys: Vec<&InteractionLog> = interactions.iter().filter(|l| l.action == "buy").collect();
    let monthly_new_customers = buys.len() as f64 / tick.max(1) as f64 * TICKS_PER_MONTH;
    let price = unit.price_per_unit;

    if !unit.revenue_model.is_recurring() {
        return RevenueMetrics {
            monthly_revenue: monthly_new_customers * price,
            cumulative_revenue: buys.len() as f64 * price,
            monthly_new_customers,
        };
    }

    let seconds_per_month = TICKS_PER_MONTH * if tick_seconds > 0.0 { tick_seconds } else { 1.0 };
    let months_since = |ts: f64| ((now - ts) / seconds_per_month).max(0.0);
    let cancels: Vec<&InteractionLog> = interactions
        .iter()
        .filter(|l| l.action == "sell" || l.action == "cancel")
        .collect();

    let earned: f64 = buys.iter().map(|l| months_since(l.timestamp) * price).sum();
    let lost: f64 = cancels.iter().map(|l| months_since(l.timestamp) * price).sum();
    let subscribers = buys.len().saturating_sub(cancels.len());

    RevenueMetrics {
        monthly_revenue: subscribers as f64 * price,
        cumulative_revenue: (earned - lost).max(0.0),
        monthly_new_customers,
    }
}

/// Interactions by employees that signal low morale
pub fn morale_incidents(interactions: &[InteractionLog], employee_ids: &HashSet<String>) -> usize {
    interactions
        .iter()
        .filter(|l| employee_ids.contains(&l.actor_id) && MORALE_ACTIONS.contains(&l.action.as_str()))
        .count()
}

/// Monthly burn: fixed cost + COGS + marketing + variable opex, inflated
/// by `MORALE_PENALTY` per morale incident.
pub fn burn_rate(
    unit: &UnitEconomics,
    monthly_revenue: f64,
    monthly_new_customers: f64,
    morale_incidents: usize,
) -> f64 {
    let cogs = monthly_revenue * (1.0 - unit.gross_margin);
    let marketing = monthly_new_customers * unit.cac;
    let variable_opex = monthly_revenue * unit.opex_ratio;
    let burn = unit.base_opex + cogs + marketing + variable_opex;
    burn * (1.0 + morale_incidents as f64 * MORALE_PENALTY)
}

/// Months until cash runs out, projected month by month.
///
/// Current cash is `initial_capital - burn * max(months_elapsed, 1) +
/// cumulative_revenue`; revenue and burn then grow at their configured
/// monthly rates. Capped at `MAX_RUNWAY_MONTHS`; 0 when already out of cash.
pub fn runway_months(
    funding: &FundingState,
    burn: f64,
    monthly_revenue: f64,
    cumulative_revenue: f64,
    tick: u64,
) -> f64 {
    let months_elapsed = (tick as f64 / TICKS_PER_MONTH).max(1.0);
    let mut cash = funding.initial_capital - burn * months_elapsed + cumulative_revenue;
    if cash <= 0.0 {
        return 0.0;
    }
    let mut months = 0;
    let mut sim_revenue = monthly_revenue;
    let mut sim_burn = burn;
    while cash > 0.0 && months < MAX_RUNWAY_MONTHS {
        months += 1;
        sim_revenue *= 1.0 + funding.revenue_growth_rate;
        sim_burn *= 1.0 + funding.burn_growth_rate;
        cash -= sim_burn - sim_revenue;
    }
    f64::from(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economics::params::RevenueModel;

    fn log(actor: &str, action: &str, ts: f64) -> InteractionLog {
        InteractionLog::new("sim", actor, action, "startup", ts)
    }

    #[test]
    fn test_adoption_is_logistic() {
        let market = MarketParams::default();
        assert!((adoption_rate(&market, 100) - 0.5).abs() < 1e-12);
        let mut prev = 0.0;
        for t in 0..=100 {
            let a = adoption_rate(&market, t);
            assert!(a > prev);
            prev = a;
        }
        let steep = MarketParams {
            viral_coefficient: 1000.0,
            ..MarketParams::default()
        };
        assert_eq!(adoption_rate(&steep, 0), 0.0);
        assert_eq!(adoption_rate(&steep, 200), 1.0);
    }

    #[test]
    fn test_churn_cohorts() {
        assert_eq!(churn_rate(&[], 10.0, 1.0, 200.0), 0.0);
        let logs = vec![log("a", "buy", 0.0), log("b", "buy", 200.0), log("a", "buy", 300.0)];
        // a is 200 ticks old (survival 0.5), b is 0 ticks old (survival 1.0)
        let churn = churn_rate(&logs, 200.0, 1.0, 200.0);
        assert!((churn - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_quality_and_share() {
        assert_eq!(product_quality(&[]), 0.5);
        let logs = vec![
            log("a", "buy", 0.0),
            log("a", "buy", 1.0),
            log("b", "ignore", 2.0),
            log("c", "wait", 3.0),
        ];
        let quality = product_quality(&logs);
        assert!((quality - 2.0 / 3.0).abs() < 1e-12);

        let market = MarketParams::default();
        assert!((market_share(0.5, &market) - 0.25).abs() < 1e-12);
        let monopoly = MarketParams {
            competitor_count: 0.0,
            ..MarketParams::default()
        };
        assert_eq!(market_share(0.1, &monopoly), 1.0);
    }

    #[test]
    fn test_subscription_revenue() {
        let unit = UnitEconomics {
            revenue_model: RevenueModel::Subscription,
            price_per_unit: 10.0,
            ..UnitEconomics::default()
        };
        let logs = vec![log("a", "buy", 0.0), log("b", "buy", 30.0), log("b", "cancel", 60.0)];
        let r = revenue(&logs, 90, 90.0, 1.0, &unit);
        // 3 months + 2 months - 1 month
        assert!((r.cumulative_revenue - 40.0).abs() < 1e-9);
        assert_eq!(r.monthly_revenue, 10.0);
        assert!((r.monthly_new_customers - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_burn_with_morale() {
        let unit = UnitEconomics::default();
        let base = burn_rate(&unit, 1000.0, 10.0, 0);
        assert!((base - (5000.0 + 300.0 + 500.0 + 500.0)).abs() < 1e-9);
        let stressed = burn_rate(&unit, 1000.0, 10.0, 10);
        assert!((stressed - base * 1.01).abs() < 1e-9);

        let employees: HashSet<String> = ["e1".to_string()].into_iter().collect();
        let logs = vec![log("e1", "complain", 0.0), log("e1", "build", 1.0), log("c1", "complain", 2.0)];
        assert_eq!(morale_incidents(&logs, &employees), 1);
    }

    #[test]
    fn test_runway() {
        let funding = FundingState {
            initial_capital: 100_000.0,
            revenue_growth_rate: 0.0,
            burn_growth_rate: 0.0,
        };
        // 100k - 10k = 90k left, net burn 10k per month
        assert_eq!(runway_months(&funding, 10_000.0, 0.0, 0.0, 10), 9.0);
        assert_eq!(runway_months(&funding, 200_000.0, 0.0, 0.0, 10), 0.0);
        assert_eq!(runway_months(&funding, 1000.0, 5000.0, 0.0, 10), 60.0);
    }
}
