//! Time-indexed containers shared by the engines and the backtests
//!
//! All containers index their rows by trading day (`NaiveDate`) in strictly
//! increasing order. Missing observations are stored as `NaN` and are never
//! silently replaced by zero here; the aggregation step decides that.

use crate::error::{Result, TailRiskError};
use chrono::NaiveDate;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

fn check_index(index: &[NaiveDate]) -> Result<()> {
    if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
        return Err(TailRiskError::InvalidParameter(format!(
            "Day index must be strictly increasing ({} followed by {})",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Shift values forward by `periods`, filling the head with `NaN`
///
/// After `shift(values, 1)` the value at position `t` is the one that was
/// at `t - 1`.
pub fn shift(values: &[f64], periods: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if periods < n {
        out[periods..].copy_from_slice(&values[..n - periods]);
    }
    out
}

/// Scalar time series (e.g. a portfolio return or a VaR series)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    index: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series, validating ordering and length
    pub fn new(index: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(TailRiskError::InvalidParameter(format!(
                "Index has {} days but {} values were supplied",
                index.len(),
                values.len()
            )));
        }
        check_index(&index)?;
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value on a given day, if the day is part of the index
    pub fn get(&self, day: NaiveDate) -> Option<f64> {
        self.index
            .binary_search(&day)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Lag the series by `periods` days on the same index
    pub fn shift(&self, periods: usize) -> Self {
        Self {
            index: self.index.clone(),
            values: shift(&self.values, periods),
        }
    }

    /// Loss convention: loss = -return
    pub fn negate(&self) -> Self {
        Self {
            index: self.index.clone(),
            values: self.values.iter().map(|v| -v).collect(),
        }
    }

    /// Number of non-missing values
    pub fn count_valid(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    pub(crate) fn from_parts_unchecked(index: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Self { index, values }
    }
}

/// Per-instrument return table: rows are days, columns are instruments
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    index: Vec<NaiveDate>,
    instruments: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnTable {
    /// Create a table from a (days × instruments) matrix
    pub fn new(
        index: Vec<NaiveDate>,
        instruments: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self> {
        if values.nrows() != index.len() || values.ncols() != instruments.len() {
            return Err(TailRiskError::InvalidParameter(format!(
                "Matrix is {}x{} but index has {} days and {} instruments",
                values.nrows(),
                values.ncols(),
                index.len(),
                instruments.len()
            )));
        }
        check_index(&index)?;
        for (i, name) in instruments.iter().enumerate() {
            if instruments[..i].contains(name) {
                return Err(TailRiskError::InvalidParameter(format!(
                    "Duplicate instrument column: {}",
                    name
                )));
            }
        }
        Ok(Self {
            index,
            instruments,
            values,
        })
    }

    /// Create a table from one equally indexed column per instrument
    pub fn from_columns(index: Vec<NaiveDate>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let nrows = index.len();
        if let Some((name, col)) = columns.iter().find(|(_, col)| col.len() != nrows) {
            return Err(TailRiskError::InvalidParameter(format!(
                "Column {} has {} values, expected {}",
                name,
                col.len(),
                nrows
            )));
        }
        let values = DMatrix::from_fn(nrows, columns.len(), |r, c| columns[c].1[r]);
        let instruments = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(index, instruments, values)
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn num_days(&self) -> usize {
        self.index.len()
    }

    pub fn num_instruments(&self) -> usize {
        self.instruments.len()
    }

    /// Single instrument column as a series
    pub fn column(&self, instrument: &str) -> Option<TimeSeries> {
        let col = self.instruments.iter().position(|name| name == instrument)?;
        Some(TimeSeries::from_parts_unchecked(
            self.index.clone(),
            self.values.column(col).iter().copied().collect(),
        ))
    }

    /// Rows in `start..end` that have no missing instrument value
    pub fn complete_rows(&self, start: usize, end: usize) -> DMatrix<f64> {
        let rows: Vec<usize> = (start..end)
            .filter(|&r| self.values.row(r).iter().all(|v| !v.is_nan()))
            .collect();
        DMatrix::from_fn(rows.len(), self.values.ncols(), |i, c| {
            self.values[(rows[i], c)]
        })
    }
}

/// Daily VaR / ES estimates on a day index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSeries {
    pub index: Vec<NaiveDate>,
    pub var: Vec<f64>,
    pub es: Vec<f64>,
}

impl RiskSeries {
    pub(crate) fn new(index: Vec<NaiveDate>, var: Vec<f64>, es: Vec<f64>) -> Self {
        debug_assert_eq!(index.len(), var.len());
        debug_assert_eq!(index.len(), es.len());
        Self { index, var, es }
    }

    /// Shift both columns one day forward so day t only uses data through t-1
    pub fn lagged(&self) -> Self {
        Self {
            index: self.index.clone(),
            var: shift(&self.var, 1),
            es: shift(&self.es, 1),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// VaR column as a series (the backtest input)
    pub fn var_series(&self) -> TimeSeries {
        TimeSeries::from_parts_unchecked(self.index.clone(), self.var.clone())
    }

    /// ES column as a series
    pub fn es_series(&self) -> TimeSeries {
        TimeSeries::from_parts_unchecked(self.index.clone(), self.es.clone())
    }
}
