//! # VaR Backtesting
//!
//! Statistical validation of lagged VaR series against realized losses.
//!
//! ## Modules
//!
//! - `exceedance`: hit series on the common days of returns and VaR
//! - `kupiec`: unconditional coverage (proportion of failures)
//! - `christoffersen`: independence of consecutive hits, conditional coverage
//! - `traffic_light`: regulatory green / yellow / red banding
//! - `summary`: one labeled result row per model and confidence level

mod christoffersen;
mod exceedance;
mod kupiec;
mod summary;
mod traffic_light;

pub use christoffersen::{
    christoffersen_independence, conditional_coverage, IndependenceTest, TransitionCounts,
};
pub use exceedance::{exceedances, HitSeries};
pub use kupiec::{kupiec_pof, KupiecTest};
pub use summary::{summarize_backtest, BacktestRow, BacktestTable};
pub use traffic_light::{traffic_light, TrafficLight};

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Probabilities inside log-likelihoods are clipped into (EPS, 1 - EPS)
pub const LOG_EPS: f64 = 1e-12;

pub(crate) fn clip_probability(p: f64) -> f64 {
    p.clamp(LOG_EPS, 1.0 - LOG_EPS)
}

/// Upper-tail probability of a chi-square statistic, NaN in, NaN out
pub(crate) fn chi_square_p_value(statistic: f64, degrees_of_freedom: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    match ChiSquared::new(degrees_of_freedom) {
        Ok(dist) => 1.0 - dist.cdf(statistic.max(0.0)),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_chi_square_p_values() {
        assert_abs_diff_eq!(chi_square_p_value(0.0, 1.0), 1.0);
        assert_abs_diff_eq!(chi_square_p_value(3.841_458_82, 1.0), 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(chi_square_p_value(5.991_464_55, 2.0), 0.05, epsilon = 1e-6);
        assert!(chi_square_p_value(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_clip_probability() {
        assert_eq!(clip_probability(0.0), LOG_EPS);
        assert_eq!(clip_probability(1.0), 1.0 - LOG_EPS);
        assert_eq!(clip_probability(0.3), 0.3);
    }
}
