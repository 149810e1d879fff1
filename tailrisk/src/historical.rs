//! Historical simulation VaR / ES
//!
//! VaR_t is the linear-interpolated α-quantile of the trailing `window`
//! losses, and ES_t is the mean of the losses in that window that are at or
//! above VaR_t. Losses are `-return`.

use crate::error::{check_alpha, check_window, Result};
use crate::rolling::{quantile_sorted, tail_mean, window_at};
use crate::series::{RiskSeries, TimeSeries};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Historical simulation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalConfig {
    /// Confidence level (e.g. 0.95, 0.99)
    pub alpha: f64,

    /// Number of trailing days per estimate
    pub window: usize,

    /// Shift the output one day so day t only uses data through t-1
    pub lagged: bool,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            alpha: 0.95,
            window: 250,
            lagged: true,
        }
    }
}

/// Rolling historical simulation engine
#[derive(Debug, Clone)]
pub struct HistoricalVar {
    config: HistoricalConfig,
}

impl HistoricalVar {
    pub fn new(config: HistoricalConfig) -> Result<Self> {
        check_alpha(config.alpha)?;
        check_window(config.window)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HistoricalConfig {
        &self.config
    }

    /// Estimate VaR / ES from a portfolio return series
    pub fn estimate(&self, portfolio_returns: &TimeSeries) -> Result<RiskSeries> {
        self.estimate_losses(&portfolio_returns.negate())
    }

    /// Estimate VaR / ES from a loss series
    pub fn estimate_losses(&self, losses: &TimeSeries) -> Result<RiskSeries> {
        let HistoricalConfig {
            alpha,
            window,
            lagged,
        } = self.config;

        info!(alpha, window, days = losses.len(), "Running historical simulation");

        let (var, es) = rolling_var_es(losses.values(), alpha, window);
        let raw = RiskSeries::new(losses.index().to_vec(), var, es);

        Ok(if lagged { raw.lagged() } else { raw })
    }
}

/// Unlagged rolling VaR / ES columns for a loss slice
pub fn rolling_var_es(losses: &[f64], alpha: f64, window: usize) -> (Vec<f64>, Vec<f64>) {
    (0..losses.len())
        .map(|pos| match window_at(losses, window, pos) {
            Some(slice) => var_es(slice, alpha),
            None => (f64::NAN, f64::NAN),
        })
        .unzip()
}

/// VaR / ES of a single loss sample
pub fn var_es(sample: &[f64], alpha: f64) -> (f64, f64) {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let var = quantile_sorted(&sorted, alpha);
    (var, tail_mean(&sorted, var))
}
