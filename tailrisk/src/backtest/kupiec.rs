//! Kupiec proportion-of-failures test
//!
//! LR_uc = -2 · [(T - X) · ln((1 - p) / (1 - π̂)) + X · ln(p / π̂)]
//!
//! with p = 1 - α and π̂ = X / T, compared against χ²(1).

use super::{chi_square_p_value, clip_probability, HitSeries};
use serde::{Deserialize, Serialize};

/// Unconditional coverage test outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KupiecTest {
    /// Likelihood-ratio statistic
    pub statistic: f64,

    /// χ²(1) upper-tail probability
    pub p_value: f64,

    /// Observed exceedances X
    pub exceedances: usize,

    /// Number of trials T
    pub observations: usize,

    /// Exceedances expected under the null, (1 - α) · T
    pub expected_exceedances: f64,
}

pub fn kupiec_pof(hits: &HitSeries, alpha: f64) -> KupiecTest {
    let t = hits.len();
    let x = hits.count();
    let p_nominal = 1.0 - alpha;

    let pi_hat = clip_probability(if t > 0 { x as f64 / t as f64 } else { 0.0 });
    let p = clip_probability(p_nominal);

    let (t_f, x_f) = (t as f64, x as f64);
    let statistic = -2.0 * ((t_f - x_f) * ((1.0 - p) / (1.0 - pi_hat)).ln() + x_f * (p / pi_hat).ln());

    KupiecTest {
        statistic,
        p_value: chi_square_p_value(statistic, 1.0),
        exceedances: x,
        observations: t,
        expected_exceedances: p_nominal * t_f,
    }
}
