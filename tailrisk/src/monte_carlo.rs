//! Monte Carlo VaR
//!
//! For every day t the engine calibrates a mean vector μ and covariance Σ on
//! the `window` days strictly before t, factors Σ = L·Lᵀ, draws correlated
//! returns μ + L·Z, aggregates them with the normalized portfolio weights and
//! takes the empirical α-quantile of the simulated losses.
//!
//! Seeding: each day owns a generator seeded from `(seed, day index)`, so a
//! day's draws do not depend on which other days were simulated. Results are
//! identical across runs, across window changes that keep the day, and with
//! or without the `parallel` feature.

use crate::error::{check_alpha, check_window, Result, TailRiskError};
use crate::portfolio::Weights;
use crate::rolling::{quantile_linear, tail_mean};
use crate::series::{ReturnTable, RiskSeries};
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Diagonal term added once when Σ is not positive-definite
pub const COVARIANCE_JITTER: f64 = 1e-8;

/// Minimum complete rows needed to calibrate a covariance matrix
const MIN_CALIBRATION_ROWS: usize = 2;

/// Source of independent standard-normal draws for a given day
pub trait NormalDraws: Send + Sync {
    /// A `rows × cols` matrix of N(0, 1) variates for simulation day `day`
    fn draws(&self, day: usize, rows: usize, cols: usize) -> DMatrix<f64>;
}

/// `StdRng`-backed draws, reseeded per day from `(seed, day)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededNormalDraws {
    seed: u64,
}

impl SeededNormalDraws {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed of the generator used for `day`
    pub fn day_seed(&self, day: usize) -> u64 {
        splitmix64(self.seed ^ splitmix64(day as u64))
    }
}

impl NormalDraws for SeededNormalDraws {
    fn draws(&self, day: usize, rows: usize, cols: usize) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(self.day_seed(day));
        DMatrix::from_fn(rows, cols, |_, _| rng.sample::<f64, _>(StandardNormal))
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Monte Carlo engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub alpha: f64,

    /// Calibration window in days
    pub window: usize,

    /// Simulated draws per day
    pub n_simulations: usize,

    /// Base seed for the per-day generators
    pub seed: u64,

    pub lagged: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            alpha: 0.95,
            window: 250,
            n_simulations: 20_000,
            seed: 42,
            lagged: true,
        }
    }
}

/// Monte Carlo VaR engine
///
/// The ES column of the output is the mean simulated loss at or above the
/// simulated VaR. Backtests only consume the VaR column.
pub struct MonteCarloVar<D: NormalDraws = SeededNormalDraws> {
    config: MonteCarloConfig,
    draws: D,
}

impl MonteCarloVar<SeededNormalDraws> {
    pub fn new(config: MonteCarloConfig) -> Result<Self> {
        Self::with_draws(config, SeededNormalDraws::new(config.seed))
    }
}

impl<D: NormalDraws> MonteCarloVar<D> {
    /// Engine with a custom draw source
    pub fn with_draws(config: MonteCarloConfig, draws: D) -> Result<Self> {
        check_alpha(config.alpha)?;
        check_window(config.window)?;
        if config.n_simulations == 0 {
            return Err(TailRiskError::InvalidParameter(
                "Number of simulations must be positive".to_string(),
            ));
        }
        Ok(Self { config, draws })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Rolling VaR (and simulated ES) over every day of the table
    pub fn estimate(&self, table: &ReturnTable, weights: &Weights) -> Result<RiskSeries> {
        let w = weights.aligned_to(table.instruments())?;
        let n_days = table.num_days();

        info!(
            alpha = self.config.alpha,
            window = self.config.window,
            n_simulations = self.config.n_simulations,
            days = n_days,
            instruments = table.num_instruments(),
            "Running Monte Carlo VaR"
        );

        #[cfg(feature = "parallel")]
        let cells: Vec<(f64, f64)> = (0..n_days)
            .into_par_iter()
            .map(|t| self.simulate_day(table, &w, t))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let cells: Vec<(f64, f64)> = (0..n_days)
            .map(|t| self.simulate_day(table, &w, t))
            .collect::<Result<_>>()?;

        let (var, es) = cells.into_iter().unzip();
        let raw = RiskSeries::new(table.index().to_vec(), var, es);

        Ok(if self.config.lagged { raw.lagged() } else { raw })
    }

    /// Simulated one-day losses calibrated on the last `window` days
    ///
    /// This is the loss distribution behind the most recent estimate, for
    /// histogram-style reporting.
    pub fn latest_loss_distribution(
        &self,
        table: &ReturnTable,
        weights: &Weights,
    ) -> Result<Vec<f64>> {
        let n_days = table.num_days();
        let window = self.config.window;
        if n_days < window + 1 {
            return Err(TailRiskError::InsufficientData(format!(
                "Need at least {} days to calibrate a {} day window, got {}",
                window + 1,
                window,
                n_days
            )));
        }

        let w = weights.aligned_to(table.instruments())?;
        let calibration = table.complete_rows(n_days - window, n_days);
        if calibration.nrows() < MIN_CALIBRATION_ROWS {
            return Err(TailRiskError::InsufficientData(format!(
                "Only {} complete rows in the calibration window",
                calibration.nrows()
            )));
        }
        self.simulate_losses(&calibration, &w, n_days)
    }

    /// (VaR, ES) for day `t`, NaN when no calibration window is available
    fn simulate_day(&self, table: &ReturnTable, w: &DVector<f64>, t: usize) -> Result<(f64, f64)> {
        let window = self.config.window;
        if t < window {
            return Ok((f64::NAN, f64::NAN));
        }

        let calibration = table.complete_rows(t - window, t);
        if calibration.nrows() < MIN_CALIBRATION_ROWS {
            debug!(
                day = t,
                rows = calibration.nrows(),
                "Skipping Monte Carlo day with too few complete rows"
            );
            return Ok((f64::NAN, f64::NAN));
        }

        let mut losses = self.simulate_losses(&calibration, w, t)?;
        losses.sort_by(|a, b| a.total_cmp(b));
        let var = quantile_linear(&losses, self.config.alpha);
        Ok((var, tail_mean(&losses, var)))
    }

    fn simulate_losses(
        &self,
        calibration: &DMatrix<f64>,
        w: &DVector<f64>,
        day: usize,
    ) -> Result<Vec<f64>> {
        let (mu, cov) = mean_and_covariance(calibration);
        let l = cholesky_with_fallback(cov, day)?;

        let z = self
            .draws
            .draws(day, calibration.ncols(), self.config.n_simulations);
        let correlated = &l * &z;
        let port_mean = w.dot(&mu);

        Ok(correlated
            .column_iter()
            .map(|draw| -(port_mean + w.dot(&draw)))
            .collect())
    }
}

/// Sample mean vector and covariance matrix (divisor n - 1) of the rows
pub fn mean_and_covariance(rows: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let n = rows.nrows();
    let k = rows.ncols();
    let mu = DVector::from_fn(k, |c, _| rows.column(c).sum() / n as f64);

    let mut cov = DMatrix::zeros(k, k);
    for i in 0..k {
        for j in i..k {
            let c: f64 = rows
                .column(i)
                .iter()
                .zip(rows.column(j).iter())
                .map(|(x, y)| (x - mu[i]) * (y - mu[j]))
                .sum::<f64>()
                / (n - 1) as f64;
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }
    (mu, cov)
}

/// Lower Cholesky factor of `cov`, retrying once with a diagonal jitter
pub fn cholesky_with_fallback(cov: DMatrix<f64>, day: usize) -> Result<DMatrix<f64>> {
    let k = cov.nrows();
    if let Some(chol) = Cholesky::new(cov.clone()) {
        return Ok(chol.l());
    }

    warn!(day, jitter = COVARIANCE_JITTER, "Covariance not positive-definite, regularizing");
    let regularized = cov + DMatrix::identity(k, k) * COVARIANCE_JITTER;
    Cholesky::new(regularized)
        .map(|chol| chol.l())
        .ok_or_else(|| {
            TailRiskError::SingularCovariance(format!(
                "Day {}: still not positive-definite after adding {} to the diagonal",
                day, COVARIANCE_JITTER
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn table(columns: Vec<(&str, Vec<f64>)>) -> ReturnTable {
        let n = columns[0].1.len();
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let index = (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        ReturnTable::from_columns(
            index,
            columns
                .into_iter()
                .map(|(name, col)| (name.to_string(), col))
                .collect(),
        )
        .unwrap()
    }

    fn sample_table(n: usize) -> ReturnTable {
        table(vec![
            ("A", (0..n).map(|i| (i as f64 * 0.7).sin() * 0.02).collect()),
            ("B", (0..n).map(|i| (i as f64 * 1.3).cos() * 0.015).collect()),
        ])
    }

    fn weights() -> Weights {
        [("A", 0.6), ("B", 0.4)].into_iter().collect()
    }

    fn config(window: usize, lagged: bool) -> MonteCarloConfig {
        MonteCarloConfig {
            alpha: 0.95,
            window,
            n_simulations: 2_000,
            seed: 7,
            lagged,
        }
    }

    /// Returns the same fixed draw in every cell
    struct ConstantDraws(f64);

    impl NormalDraws for ConstantDraws {
        fn draws(&self, _day: usize, rows: usize, cols: usize) -> DMatrix<f64> {
            DMatrix::from_element(rows, cols, self.0)
        }
    }

    #[test]
    fn test_covariance_matches_hand_computation() {
        let rows = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 9.0]);
        let (mu, cov) = mean_and_covariance(&rows);

        assert_abs_diff_eq!(mu[0], 2.0);
        assert_abs_diff_eq!(mu[1], 5.0);
        assert_abs_diff_eq!(cov[(0, 0)], 1.0);
        assert_abs_diff_eq!(cov[(1, 1)], 13.0);
        assert_abs_diff_eq!(cov[(0, 1)], 3.5);
        assert_abs_diff_eq!(cov[(1, 0)], 3.5);
    }

    #[test]
    fn test_cholesky_regularizes_singular_matrix() {
        // Zero variance on the second leg
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let l = cholesky_with_fallback(cov, 0).unwrap();
        assert_abs_diff_eq!(l[(1, 1)], COVARIANCE_JITTER.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_fails_for_negative_definite() {
        let cov = DMatrix::from_row_slice(1, 1, &[-1.0]);
        let err = cholesky_with_fallback(cov, 3).unwrap_err();
        assert!(matches!(err, TailRiskError::SingularCovariance(_)));
    }

    #[test]
    fn test_reproducible() {
        let t = sample_table(60);
        let engine = MonteCarloVar::new(config(20, true)).unwrap();

        let first = engine.estimate(&t, &weights()).unwrap();
        let second = engine.estimate(&t, &weights()).unwrap();

        for (a, b) in first.var.iter().zip(&second.var) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_day_values_independent_of_history_length() {
        let engine = MonteCarloVar::new(config(20, false)).unwrap();
        let short = engine.estimate(&sample_table(40), &weights()).unwrap();
        let long = engine.estimate(&sample_table(60), &weights()).unwrap();

        for t in 0..40 {
            assert_eq!(short.var[t].to_bits(), long.var[t].to_bits());
        }
    }

    #[test]
    fn test_warmup_and_lag() {
        let t = sample_table(30);
        let raw = MonteCarloVar::new(config(10, false))
            .unwrap()
            .estimate(&t, &weights())
            .unwrap();
        let lagged = MonteCarloVar::new(config(10, true))
            .unwrap()
            .estimate(&t, &weights())
            .unwrap();

        assert!(raw.var[..10].iter().all(|v| v.is_nan()));
        assert!(raw.var[10..].iter().all(|v| v.is_finite()));
        assert!(lagged.var[..11].iter().all(|v| v.is_nan()));
        for d in 1..30 {
            assert_eq!(lagged.var[d].to_bits(), raw.var[d - 1].to_bits());
        }
    }

    #[test]
    fn test_constant_draws_give_mean_loss() {
        // With Z = 0 every simulated return is the calibration mean
        let t = table(vec![
            ("A", vec![0.01, 0.03, 0.02, 0.0]),
            ("B", vec![-0.01, 0.01, 0.0, 0.0]),
        ]);
        let engine = MonteCarloVar::with_draws(config(3, false), ConstantDraws(0.0)).unwrap();
        let out = engine.estimate(&t, &weights()).unwrap();

        let expected = -(0.6 * 0.02 + 0.4 * 0.0);
        assert_abs_diff_eq!(out.var[3], expected, epsilon = 1e-12);
        assert_abs_diff_eq!(out.es[3], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_incomplete_window_is_nan() {
        let t = table(vec![
            ("A", vec![0.01, f64::NAN, f64::NAN, 0.02, 0.01]),
            ("B", vec![0.02, 0.01, 0.03, f64::NAN, 0.0]),
        ]);
        let engine = MonteCarloVar::new(config(3, false)).unwrap();
        let out = engine.estimate(&t, &weights()).unwrap();

        // Day 3 calibrates on rows 0..3 where only row 0 is complete
        assert!(out.var[3].is_nan());
        // Day 4 calibrates on rows 1..4, none complete
        assert!(out.var[4].is_nan());
    }

    #[test]
    fn test_latest_loss_distribution() {
        let engine = MonteCarloVar::new(config(20, true)).unwrap();
        let losses = engine
            .latest_loss_distribution(&sample_table(30), &weights())
            .unwrap();
        assert_eq!(losses.len(), 2_000);

        let err = engine
            .latest_loss_distribution(&sample_table(20), &weights())
            .unwrap_err();
        assert!(matches!(err, TailRiskError::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_simulation_count() {
        let result = MonteCarloVar::new(MonteCarloConfig {
            n_simulations: 0,
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
