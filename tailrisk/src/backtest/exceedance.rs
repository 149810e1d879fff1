//! Exceedance (hit) detection

use crate::error::{Result, TailRiskError};
use crate::series::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Hit indicators on the days where both returns and VaR exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitSeries {
    pub index: Vec<NaiveDate>,
    pub hits: Vec<bool>,
}

impl HitSeries {
    pub fn new(index: Vec<NaiveDate>, hits: Vec<bool>) -> Self {
        debug_assert_eq!(index.len(), hits.len());
        Self { index, hits }
    }

    /// Hit series without dates, e.g. for testing the statistics directly
    pub fn from_hits(hits: Vec<bool>) -> Self {
        let start = NaiveDate::MIN;
        let index = (0..hits.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        Self { index, hits }
    }

    /// Number of trials T
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of exceedances X
    pub fn count(&self) -> usize {
        self.hits.iter().filter(|&&h| h).count()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.hits.is_empty() {
            f64::NAN
        } else {
            self.count() as f64 / self.len() as f64
        }
    }
}

/// Hit = 1 iff realized loss (-return) strictly exceeds the VaR for that day
///
/// Days missing from either series, or holding `NaN` in either, are
/// dropped. No common day at all is an error.
pub fn exceedances(returns: &TimeSeries, var: &TimeSeries) -> Result<HitSeries> {
    let (r_idx, r_val) = (returns.index(), returns.values());
    let (v_idx, v_val) = (var.index(), var.values());

    let mut index = Vec::new();
    let mut hits = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < r_idx.len() && j < v_idx.len() {
        match r_idx[i].cmp(&v_idx[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let (r, v) = (r_val[i], v_val[j]);
                if !r.is_nan() && !v.is_nan() {
                    index.push(r_idx[i]);
                    hits.push(-r > v);
                }
                i += 1;
                j += 1;
            }
        }
    }

    if hits.is_empty() {
        return Err(TailRiskError::MisalignedSeries(
            "Returns and VaR share no day with both values present".to_string(),
        ));
    }
    Ok(HitSeries::new(index, hits))
}
