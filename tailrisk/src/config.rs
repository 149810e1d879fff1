//! Run configuration
//!
//! One immutable structure describing the portfolio and the model settings,
//! loadable from YAML or JSON.

use crate::error::{check_alpha, check_window, Result, TailRiskError};
use crate::portfolio::Weights;
use serde::{Deserialize, Serialize};

/// Top-level configuration for a VaR estimation and backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailRiskConfig {
    /// Raw allocation weight per instrument (normalized before use)
    pub weights: Weights,

    /// Confidence levels to estimate and backtest
    #[serde(default = "default_alpha_levels")]
    pub alpha_levels: Vec<f64>,

    /// Rolling / calibration window in trading days
    #[serde(default = "default_window")]
    pub window: usize,

    /// Lag every estimate one day (required for out-of-sample backtests)
    #[serde(default = "default_lagged")]
    pub lagged: bool,

    #[serde(default)]
    pub ewma: EwmaConfig,

    #[serde(default)]
    pub monte_carlo: MonteCarloSettings,
}

/// EWMA volatility settings for the parametric model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwmaConfig {
    /// Decay factor λ
    #[serde(default = "default_ewma_lambda")]
    pub lambda: f64,

    /// Observations before the first volatility estimate
    #[serde(default = "default_ewma_min_periods")]
    pub min_periods: usize,
}

impl Default for EwmaConfig {
    fn default() -> Self {
        Self {
            lambda: default_ewma_lambda(),
            min_periods: default_ewma_min_periods(),
        }
    }
}

/// Monte Carlo simulation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSettings {
    #[serde(default = "default_n_simulations")]
    pub n_simulations: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            n_simulations: default_n_simulations(),
            seed: default_seed(),
        }
    }
}

fn default_alpha_levels() -> Vec<f64> {
    vec![0.95, 0.99]
}

fn default_window() -> usize {
    250
}

fn default_lagged() -> bool {
    true
}

fn default_ewma_lambda() -> f64 {
    0.94
}

fn default_ewma_min_periods() -> usize {
    30
}

fn default_n_simulations() -> usize {
    20_000
}

fn default_seed() -> u64 {
    42
}

impl TailRiskConfig {
    /// Configuration with default model settings for the given weights
    pub fn new(weights: Weights) -> Self {
        Self {
            weights,
            alpha_levels: default_alpha_levels(),
            window: default_window(),
            lagged: default_lagged(),
            ewma: EwmaConfig::default(),
            monte_carlo: MonteCarloSettings::default(),
        }
    }

    /// Load and validate a configuration from YAML
    ///
    /// # Example
    ///
    /// ```
    /// use tailrisk::TailRiskConfig;
    ///
    /// let yaml = r#"
    /// weights:
    ///   AAPL: 0.6
    ///   MSFT: 0.4
    /// window: 100
    /// "#;
    ///
    /// let config = TailRiskConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.alpha_levels, vec![0.95, 0.99]);
    /// assert_eq!(config.window, 100);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(TailRiskError::InvalidWeights(
                "No instrument weights configured".to_string(),
            ));
        }
        self.weights.normalized()?;

        if self.alpha_levels.is_empty() {
            return Err(TailRiskError::InvalidParameter(
                "At least one confidence level is required".to_string(),
            ));
        }
        for &alpha in &self.alpha_levels {
            check_alpha(alpha)?;
        }

        check_window(self.window)?;

        if !(self.ewma.lambda > 0.0 && self.ewma.lambda < 1.0) {
            return Err(TailRiskError::InvalidParameter(format!(
                "EWMA lambda must be in (0, 1), got {}",
                self.ewma.lambda
            )));
        }
        if self.ewma.min_periods == 0 {
            return Err(TailRiskError::InvalidParameter(
                "EWMA min_periods must be at least 1".to_string(),
            ));
        }
        if self.monte_carlo.n_simulations == 0 {
            return Err(TailRiskError::InvalidParameter(
                "Number of simulations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
