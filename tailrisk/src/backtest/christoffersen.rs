//! Christoffersen independence and conditional-coverage tests
//!
//! Consecutive hit pairs are counted in a 2×2 transition matrix. The
//! independence statistic compares a first-order Markov model of hits
//! (π01, π11) with a constant hit probability π:
//!
//! LR_ind = -2 · [lnL0 - lnL1] ~ χ²(1)
//!
//! Conditional coverage adds the Kupiec statistic: LR_cc = LR_uc + LR_ind ~ χ²(2).

use super::{chi_square_p_value, clip_probability, kupiec_pof, HitSeries};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Counts of consecutive hit transitions (previous → current)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub n00: usize,
    pub n01: usize,
    pub n10: usize,
    pub n11: usize,
}

impl TransitionCounts {
    pub fn from_hits(hits: &[bool]) -> Self {
        hits.windows(2).fold(Self::default(), |mut acc, pair| {
            match (pair[0], pair[1]) {
                (false, false) => acc.n00 += 1,
                (false, true) => acc.n01 += 1,
                (true, false) => acc.n10 += 1,
                (true, true) => acc.n11 += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.n00 + self.n01 + self.n10 + self.n11
    }

    /// P(hit | no hit yesterday), 0 when no such transition exists
    pub fn pi01(&self) -> f64 {
        ratio(self.n01, self.n00 + self.n01)
    }

    /// P(hit | hit yesterday), 0 when no such transition exists
    pub fn pi11(&self) -> f64 {
        ratio(self.n11, self.n10 + self.n11)
    }

    /// Unconditional hit probability over the transitions
    pub fn pi(&self) -> f64 {
        ratio(self.n01 + self.n11, self.total())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Independence test outcome; statistic and p-value are NaN below two observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndependenceTest {
    pub statistic: f64,
    pub p_value: f64,
    pub transitions: TransitionCounts,
}

pub fn christoffersen_independence(hits: &HitSeries) -> IndependenceTest {
    if hits.len() < 2 {
        debug!(observations = hits.len(), "Too few observations for the independence test");
        return IndependenceTest {
            statistic: f64::NAN,
            p_value: f64::NAN,
            transitions: TransitionCounts::default(),
        };
    }

    let counts = TransitionCounts::from_hits(&hits.hits);
    let ln = |p: f64| clip_probability(p).ln();
    let (pi01, pi11, pi) = (counts.pi01(), counts.pi11(), counts.pi());
    let (n00, n01, n10, n11) = (
        counts.n00 as f64,
        counts.n01 as f64,
        counts.n10 as f64,
        counts.n11 as f64,
    );

    let ln_l1 = n00 * ln(1.0 - pi01) + n01 * ln(pi01) + n10 * ln(1.0 - pi11) + n11 * ln(pi11);
    let ln_l0 = (n00 + n10) * ln(1.0 - pi) + (n01 + n11) * ln(pi);
    let statistic = -2.0 * (ln_l0 - ln_l1);

    IndependenceTest {
        statistic,
        p_value: chi_square_p_value(statistic, 1.0),
        transitions: counts,
    }
}

/// LR_cc = LR_uc + LR_ind against χ²(2); returns (statistic, p-value)
pub fn conditional_coverage(hits: &HitSeries, alpha: f64) -> (f64, f64) {
    let uc = kupiec_pof(hits, alpha);
    let ind = christoffersen_independence(hits);
    let statistic = uc.statistic + ind.statistic;
    (statistic, chi_square_p_value(statistic, 2.0))
}
