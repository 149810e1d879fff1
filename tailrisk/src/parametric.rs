//! Parametric (variance-covariance) VaR / ES under a normal assumption
//!
//! With loss L ~ N(-μ, σ²) and z = Φ⁻¹(α):
//! - VaR = -μ + z · σ
//! - ES  = -μ + σ · φ(z) / (1 - α)
//!
//! μ is the rolling window mean of portfolio returns. σ is either the
//! rolling sample standard deviation or an EWMA (RiskMetrics) volatility.

use crate::error::{check_alpha, check_window, Result, TailRiskError};
use crate::rolling::{ewma_volatility, mean, rolling_map, std_dev};
use crate::series::{RiskSeries, TimeSeries};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::info;

/// Volatility estimator used by the parametric engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VolatilityModel {
    /// Rolling sample standard deviation (divisor window - 1)
    Classic,

    /// σ_t² = λ · σ_{t-1}² + (1 - λ) · r_t², effective memory ≈ 1 / (1 - λ)
    Ewma { lambda: f64, min_periods: usize },
}

impl VolatilityModel {
    /// RiskMetrics daily defaults (λ = 0.94, 30 day warm-up)
    pub const fn riskmetrics() -> Self {
        Self::Ewma {
            lambda: 0.94,
            min_periods: 30,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Self::Ewma {
            lambda,
            min_periods,
        } = *self
        {
            if !(lambda > 0.0 && lambda < 1.0) {
                return Err(TailRiskError::InvalidParameter(format!(
                    "EWMA lambda must be in (0, 1), got {}",
                    lambda
                )));
            }
            if min_periods == 0 {
                return Err(TailRiskError::InvalidParameter(
                    "EWMA warm-up must be at least one observation".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Parametric engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParametricConfig {
    pub alpha: f64,
    pub window: usize,
    pub volatility: VolatilityModel,
    pub lagged: bool,
}

impl Default for ParametricConfig {
    fn default() -> Self {
        Self {
            alpha: 0.95,
            window: 250,
            volatility: VolatilityModel::Classic,
            lagged: true,
        }
    }
}

/// Rolling normal VaR / ES engine
#[derive(Debug, Clone)]
pub struct ParametricVar {
    config: ParametricConfig,
    z: f64,
    es_multiplier: f64,
}

impl ParametricVar {
    pub fn new(config: ParametricConfig) -> Result<Self> {
        check_alpha(config.alpha)?;
        check_window(config.window)?;
        config.volatility.validate()?;

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| TailRiskError::InvalidParameter(e.to_string()))?;
        let z = normal.inverse_cdf(config.alpha);
        let es_multiplier = normal.pdf(z) / (1.0 - config.alpha);

        Ok(Self {
            config,
            z,
            es_multiplier,
        })
    }

    pub fn config(&self) -> &ParametricConfig {
        &self.config
    }

    /// Standard normal quantile Φ⁻¹(α)
    pub fn z_score(&self) -> f64 {
        self.z
    }

    /// VaR and ES for a given return mean and volatility
    pub fn var_es(&self, mu: f64, sigma: f64) -> (f64, f64) {
        (-mu + self.z * sigma, -mu + sigma * self.es_multiplier)
    }

    pub fn estimate(&self, portfolio_returns: &TimeSeries) -> Result<RiskSeries> {
        let ParametricConfig {
            alpha,
            window,
            volatility,
            lagged,
        } = self.config;
        let returns = portfolio_returns.values();

        info!(alpha, window, ?volatility, days = returns.len(), "Running parametric VaR");

        let mu = rolling_map(returns, window, mean);
        let sigma = match volatility {
            VolatilityModel::Classic => rolling_map(returns, window, std_dev),
            VolatilityModel::Ewma {
                lambda,
                min_periods,
            } => ewma_volatility(returns, lambda, min_periods),
        };

        let (var, es) = mu
            .iter()
            .zip(&sigma)
            .map(|(&m, &s)| self.var_es(m, s))
            .unzip();
        let raw = RiskSeries::new(portfolio_returns.index().to_vec(), var, es);

        Ok(if lagged { raw.lagged() } else { raw })
    }
}
