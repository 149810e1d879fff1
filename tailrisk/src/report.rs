//! End-to-end estimation and backtest runs
//!
//! Wires a [`TailRiskConfig`] and a [`ReturnTable`] through portfolio
//! aggregation, the four VaR models and the backtesting suite. Everything
//! stays in memory; plotting and persistence belong to the caller.

use crate::backtest::{summarize_backtest, BacktestTable};
use crate::config::TailRiskConfig;
use crate::error::{Result, TailRiskError};
use crate::historical::{HistoricalConfig, HistoricalVar};
use crate::monte_carlo::{MonteCarloConfig, MonteCarloVar};
use crate::parametric::{ParametricConfig, ParametricVar, VolatilityModel};
use crate::portfolio::portfolio_returns;
use crate::series::{ReturnTable, RiskSeries, TimeSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// VaR model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    HistoricalSimulation,
    ParametricNormal,
    ParametricEwma,
    MonteCarlo,
}

impl ModelKind {
    pub const ALL: [Self; 4] = [
        Self::HistoricalSimulation,
        Self::ParametricNormal,
        Self::ParametricEwma,
        Self::MonteCarlo,
    ];

    pub fn short_name(&self) -> &'static str {
        match self {
            Self::HistoricalSimulation => "HS",
            Self::ParametricNormal => "Parametric-N",
            Self::ParametricEwma => "Parametric-EWMA",
            Self::MonteCarlo => "MonteCarlo",
        }
    }

    /// Table label, e.g. "Parametric-N (99%)"
    pub fn label(&self, alpha: f64) -> String {
        format!("{} ({}%)", self.short_name(), percent(alpha))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

fn percent(alpha: f64) -> f64 {
    (alpha * 10_000.0).round() / 100.0
}

/// VaR / ES series produced by one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEstimate {
    pub model: ModelKind,
    pub label: String,
    pub series: RiskSeries,
}

/// All estimates and the backtest table for one confidence level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaReport {
    pub alpha: f64,
    pub estimates: Vec<ModelEstimate>,
    pub backtests: BacktestTable,
}

impl AlphaReport {
    pub fn estimate(&self, model: ModelKind) -> Option<&ModelEstimate> {
        self.estimates.iter().find(|e| e.model == model)
    }

    /// Returns vs. -VaR of every model, exceedances marked for `highlight`
    pub fn pnl_overlay(&self, returns: &TimeSeries, highlight: ModelKind) -> Result<PnlOverlay> {
        let var: Vec<(String, TimeSeries)> = self
            .estimates
            .iter()
            .map(|e| (e.model.short_name().to_string(), e.series.var_series()))
            .collect();
        pnl_overlay(returns, &var, highlight.short_name())
    }
}

/// Output of a full run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub portfolio_returns: TimeSeries,
    pub alphas: Vec<AlphaReport>,
}

impl RiskReport {
    /// Estimate every model at every configured alpha and backtest it
    pub fn run(config: &TailRiskConfig, table: &ReturnTable) -> Result<Self> {
        config.validate()?;
        info!(
            days = table.num_days(),
            instruments = table.num_instruments(),
            alphas = ?config.alpha_levels,
            window = config.window,
            "Starting tail-risk run"
        );

        let returns = portfolio_returns(table, &config.weights)?;
        let alphas = config
            .alpha_levels
            .iter()
            .map(|&alpha| run_alpha(config, table, &returns, alpha))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            portfolio_returns: returns,
            alphas,
        })
    }

    pub fn alpha(&self, alpha: f64) -> Option<&AlphaReport> {
        self.alphas.iter().find(|r| (r.alpha - alpha).abs() < 1e-12)
    }
}

fn run_alpha(
    config: &TailRiskConfig,
    table: &ReturnTable,
    returns: &TimeSeries,
    alpha: f64,
) -> Result<AlphaReport> {
    let mut estimates = Vec::with_capacity(ModelKind::ALL.len());
    let mut backtests = BacktestTable::new();

    for model in ModelKind::ALL {
        let series = estimate_model(config, table, returns, alpha, model)?;
        let label = model.label(alpha);
        backtests.push(summarize_backtest(
            returns,
            &series.var_series(),
            alpha,
            &label,
        )?)?;
        estimates.push(ModelEstimate {
            model,
            label,
            series,
        });
    }

    Ok(AlphaReport {
        alpha,
        estimates,
        backtests,
    })
}

fn estimate_model(
    config: &TailRiskConfig,
    table: &ReturnTable,
    returns: &TimeSeries,
    alpha: f64,
    model: ModelKind,
) -> Result<RiskSeries> {
    let window = config.window;
    let lagged = config.lagged;
    let parametric = |volatility: VolatilityModel| -> Result<RiskSeries> {
        ParametricVar::new(ParametricConfig {
            alpha,
            window,
            volatility,
            lagged,
        })?
        .estimate(returns)
    };

    match model {
        ModelKind::HistoricalSimulation => HistoricalVar::new(HistoricalConfig {
            alpha,
            window,
            lagged,
        })?
        .estimate(returns),
        ModelKind::ParametricNormal => parametric(VolatilityModel::Classic),
        ModelKind::ParametricEwma => parametric(VolatilityModel::Ewma {
            lambda: config.ewma.lambda,
            min_periods: config.ewma.min_periods,
        }),
        ModelKind::MonteCarlo => MonteCarloVar::new(MonteCarloConfig {
            alpha,
            window,
            n_simulations: config.monte_carlo.n_simulations,
            seed: config.monte_carlo.seed,
            lagged,
        })?
        .estimate(table, &config.weights),
    }
}

/// Plot-ready alignment of returns against -VaR lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlOverlay {
    /// Days where the return and every VaR series are defined
    pub index: Vec<NaiveDate>,
    pub returns: Vec<f64>,

    /// (label, -VaR) per model, aligned with `index`
    pub negative_var: Vec<(String, Vec<f64>)>,

    pub highlight: String,

    /// Days where the highlighted model was exceeded (r_t < -VaR_t)
    pub exceedance_days: Vec<NaiveDate>,
}

/// Align a return series with several VaR series for plotting
pub fn pnl_overlay(
    returns: &TimeSeries,
    var_by_label: &[(String, TimeSeries)],
    highlight: &str,
) -> Result<PnlOverlay> {
    let highlight_pos = var_by_label
        .iter()
        .position(|(label, _)| label == highlight)
        .ok_or_else(|| {
            TailRiskError::InvalidParameter(format!("Unknown highlight label: {}", highlight))
        })?;

    let mut index = Vec::new();
    let mut aligned_returns = Vec::new();
    let mut negative_var: Vec<(String, Vec<f64>)> = var_by_label
        .iter()
        .map(|(label, _)| (label.clone(), Vec::new()))
        .collect();
    let mut exceedance_days = Vec::new();

    for (&day, &r) in returns.index().iter().zip(returns.values()) {
        if r.is_nan() {
            continue;
        }
        let vars: Option<Vec<f64>> = var_by_label
            .iter()
            .map(|(_, series)| series.get(day).filter(|v| !v.is_nan()))
            .collect();
        let Some(vars) = vars else { continue };

        index.push(day);
        aligned_returns.push(r);
        if r < -vars[highlight_pos] {
            exceedance_days.push(day);
        }
        for ((_, column), v) in negative_var.iter_mut().zip(vars) {
            column.push(-v);
        }
    }

    if index.is_empty() {
        return Err(TailRiskError::MisalignedSeries(
            "No overlap between returns and VaR series".to_string(),
        ));
    }

    Ok(PnlOverlay {
        index,
        returns: aligned_returns,
        negative_var,
        highlight: highlight.to_string(),
        exceedance_days,
    })
}
