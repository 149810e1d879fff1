//! Backtest summary rows and tables

use super::{
    christoffersen_independence, exceedances, kupiec_pof, traffic_light, TrafficLight,
    chi_square_p_value,
};
use crate::error::{check_alpha, Result, TailRiskError};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Backtest outcome for one model at one confidence level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    /// Model label, e.g. "HS (99%)"
    pub method: String,
    pub alpha: f64,

    /// Number of backtested days T
    pub observations: usize,

    /// Realized exceedances X
    pub exceedances: usize,

    /// (1 - α) · T
    pub expected_exceedances: f64,

    pub kupiec_lr: f64,
    pub kupiec_p: f64,
    pub christoffersen_lr: f64,
    pub christoffersen_p: f64,

    /// Conditional coverage LR_uc + LR_ind
    pub lr_cc: f64,
    pub lr_cc_p: f64,

    pub traffic_light: TrafficLight,
}

impl BacktestRow {
    /// Conditional coverage not rejected at significance level `significance`
    pub fn passes(&self, significance: f64) -> bool {
        self.lr_cc_p > significance
    }
}

/// Exceedances, Kupiec, Christoffersen, conditional coverage and banding
/// for one lagged VaR series
pub fn summarize_backtest(
    returns: &TimeSeries,
    var: &TimeSeries,
    alpha: f64,
    label: &str,
) -> Result<BacktestRow> {
    check_alpha(alpha)?;
    let hits = exceedances(returns, var)?;

    let uc = kupiec_pof(&hits, alpha);
    let ind = christoffersen_independence(&hits);
    let lr_cc = uc.statistic + ind.statistic;

    let row = BacktestRow {
        method: label.to_string(),
        alpha,
        observations: uc.observations,
        exceedances: uc.exceedances,
        expected_exceedances: uc.expected_exceedances,
        kupiec_lr: uc.statistic,
        kupiec_p: uc.p_value,
        christoffersen_lr: ind.statistic,
        christoffersen_p: ind.p_value,
        lr_cc,
        lr_cc_p: chi_square_p_value(lr_cc, 2.0),
        traffic_light: traffic_light(uc.exceedances, uc.observations, alpha),
    };

    info!(
        method = label,
        alpha,
        observations = row.observations,
        exceedances = row.exceedances,
        lr_cc_p = row.lr_cc_p,
        traffic_light = %row.traffic_light,
        "Backtest complete"
    );

    Ok(row)
}

/// Backtest rows keyed by method label, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestTable {
    rows: Vec<BacktestRow>,
}

impl BacktestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row; labels must be unique within a table
    pub fn push(&mut self, row: BacktestRow) -> Result<()> {
        if self.get(&row.method).is_some() {
            return Err(TailRiskError::InvalidParameter(format!(
                "Duplicate backtest label: {}",
                row.method
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, method: &str) -> Option<&BacktestRow> {
        self.rows.iter().find(|row| row.method == method)
    }

    pub fn rows(&self) -> &[BacktestRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }
}
