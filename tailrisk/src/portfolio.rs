//! Portfolio aggregation
//!
//! Combines per-instrument returns into one portfolio return per day:
//! r_p,t = Σ_i w_i · r_i,t
//!
//! Weights are normalized so they sum to one (leverage is neutralized, not
//! modeled). Instruments without a weight contribute zero, and a missing
//! instrument return contributes zero for that day only.

use crate::error::{Result, TailRiskError};
use crate::series::{ReturnTable, TimeSeries};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Relative tolerance used to treat a weight sum as already normalized
const SUM_RTOL: f64 = 1e-5;
/// Absolute tolerance used to treat a weight sum as already normalized
const SUM_ATOL: f64 = 1e-8;

/// Raw allocation weights keyed by instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<String, f64>);

impl Weights {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self(weights)
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.0.get(instrument).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    /// Weights scaled to sum to one
    ///
    /// A sum already within tolerance of one is left untouched. A sum of
    /// exactly zero cannot be normalized.
    pub fn normalized(&self) -> Result<Self> {
        let sum = self.sum();
        if sum == 0.0 {
            return Err(TailRiskError::InvalidWeights(
                "Weights sum to zero".to_string(),
            ));
        }
        if !sum.is_finite() {
            return Err(TailRiskError::InvalidWeights(format!(
                "Weights sum is not finite: {}",
                sum
            )));
        }
        if (sum - 1.0).abs() <= SUM_ATOL + SUM_RTOL {
            return Ok(self.clone());
        }
        debug!(sum, "Normalizing portfolio weights");
        Ok(Self(
            self.0
                .iter()
                .map(|(name, w)| (name.clone(), w / sum))
                .collect(),
        ))
    }

    /// Normalized weight vector in the column order of `instruments`
    ///
    /// Normalization happens over the full mapping first; instruments that
    /// have no weight get zero.
    pub fn aligned_to(&self, instruments: &[String]) -> Result<DVector<f64>> {
        let normalized = self.normalized()?;
        Ok(DVector::from_iterator(
            instruments.len(),
            instruments
                .iter()
                .map(|name| normalized.get(name).unwrap_or(0.0)),
        ))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Weighted sum of instrument returns per day
pub fn portfolio_returns(table: &ReturnTable, weights: &Weights) -> Result<TimeSeries> {
    let w = weights.aligned_to(table.instruments())?;
    let values = table.values();

    let returns: Vec<f64> = (0..table.num_days())
        .map(|day| {
            values
                .row(day)
                .iter()
                .zip(w.iter())
                .filter(|(r, _)| !r.is_nan())
                .map(|(r, w)| r * w)
                .sum()
        })
        .collect();

    TimeSeries::new(table.index().to_vec(), returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    fn two_asset_table(a: Vec<f64>, b: Vec<f64>) -> ReturnTable {
        ReturnTable::from_columns(
            days(a.len()),
            vec![("A".to_string(), a), ("B".to_string(), b)],
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_sum() {
        let table = two_asset_table(vec![0.01, -0.02, 0.015], vec![-0.005, 0.01, -0.01]);
        let weights: Weights = [("A", 0.6), ("B", 0.4)].into_iter().collect();

        let r = portfolio_returns(&table, &weights).unwrap();

        assert_abs_diff_eq!(r.values()[0], 0.004, epsilon = 1e-12);
        assert_abs_diff_eq!(r.values()[1], -0.008, epsilon = 1e-12);
        assert_abs_diff_eq!(r.values()[2], 0.005, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_are_normalized() {
        let table = two_asset_table(vec![0.01], vec![0.03]);
        // 3:1 leverage collapses to 0.75 / 0.25
        let weights: Weights = [("A", 3.0), ("B", 1.0)].into_iter().collect();

        let r = portfolio_returns(&table, &weights).unwrap();
        assert_abs_diff_eq!(r.values()[0], 0.75 * 0.01 + 0.25 * 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_return_is_zero_contribution() {
        let table = two_asset_table(vec![f64::NAN, 0.02], vec![0.01, 0.01]);
        let weights: Weights = [("A", 0.5), ("B", 0.5)].into_iter().collect();

        let r = portfolio_returns(&table, &weights).unwrap();
        assert_abs_diff_eq!(r.values()[0], 0.005, epsilon = 1e-12);
        assert_abs_diff_eq!(r.values()[1], 0.015, epsilon = 1e-12);
    }

    #[test]
    fn test_unweighted_instrument_contributes_zero() {
        let table = two_asset_table(vec![0.01], vec![0.5]);
        let weights: Weights = [("A", 1.0)].into_iter().collect();

        let r = portfolio_returns(&table, &weights).unwrap();
        assert_abs_diff_eq!(r.values()[0], 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_sum_weights_rejected() {
        let table = two_asset_table(vec![0.01], vec![0.02]);
        let weights: Weights = [("A", 0.5), ("B", -0.5)].into_iter().collect();

        let err = portfolio_returns(&table, &weights).unwrap_err();
        assert!(matches!(err, TailRiskError::InvalidWeights(_)));

        assert!(Weights::default().normalized().is_err());
    }

    #[test]
    fn test_aligned_vector_order() {
        let weights: Weights = [("B", 0.25), ("A", 0.75), ("C", 0.0)].into_iter().collect();
        let w = weights
            .aligned_to(&["A".to_string(), "X".to_string(), "B".to_string()])
            .unwrap();
        assert_eq!(w.as_slice(), &[0.75, 0.0, 0.25]);
    }
}
