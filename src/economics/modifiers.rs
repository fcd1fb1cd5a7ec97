//! Seasonal multipliers and market-saturation damping.

/// Ticks per quarter
pub const TICKS_PER_QUARTER: u64 = 90;

/// Multipliers for one quarter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonal {
    /// Applied to adoption rate
    pub adoption_rate: f64,
    /// Applied to burn rate
    pub burn_rate: f64,
}

const QUARTERS: [Seasonal; 4] = [
    // post-holiday slowdown
    Seasonal { adoption_rate: 0.9, burn_rate: 1.0 },
    Seasonal { adoption_rate: 1.1, burn_rate: 1.0 },
    // summer lull
    Seasonal { adoption_rate: 0.95, burn_rate: 0.9 },
    // year-end push
    Seasonal { adoption_rate: 1.2, burn_rate: 1.1 },
];

/// Multipliers for the quarter containing `tick`
pub fn seasonal_multiplier(tick: u64) -> Seasonal {
    QUARTERS[((tick / TICKS_PER_QUARTER) % 4) as usize]
}

/// Growth modifier in [0, 1].
///
/// Penetration above 0.8 and market share above 0.7 each damp growth; the
/// stronger penalty wins.
pub fn growth_modifier(market_share: f64, penetration: f64) -> f64 {
    let saturation = if penetration > 0.8 {
        (1.0 - (penetration - 0.8) * 2.0).max(0.0)
    } else {
        1.0
    };
    let dominance = if market_share > 0.7 {
        (1.0 - (market_share - 0.7)).max(0.0)
    } else {
        1.0
    };
    saturation.min(dominance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarters_cycle() {
        assert_eq!(seasonal_multiplier(0).adoption_rate, 0.9);
        assert_eq!(seasonal_multiplier(90).adoption_rate, 1.1);
        assert_eq!(seasonal_multiplier(200).burn_rate, 0.9);
        assert_eq!(seasonal_multiplier(359).burn_rate, 1.1);
        assert_eq!(seasonal_multiplier(360), seasonal_multiplier(0));
    }

    #[test]
    fn test_growth_modifier() {
        assert_eq!(growth_modifier(0.1, 0.1), 1.0);
        assert!((growth_modifier(0.1, 1.0) - 0.6).abs() < 1e-12);
        assert!((growth_modifier(1.0, 0.1) - 0.7).abs() < 1e-12);
        assert!((growth_modifier(1.0, 1.0) - 0.6).abs() < 1e-12);
    }
}
