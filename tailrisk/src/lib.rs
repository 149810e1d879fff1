//! # tailrisk: Rolling VaR / ES Estimation and Backtesting
//!
//! This library estimates daily Value-at-Risk and Expected Shortfall for a
//! weighted portfolio from historical returns, and validates the estimates
//! against realized losses.
//!
//! ## Core Components
//!
//! - **Portfolio aggregation**: weighted daily portfolio returns
//! - **HistoricalVar**: rolling empirical quantile and tail mean
//! - **ParametricVar**: normal VaR / ES with classic or EWMA volatility
//! - **MonteCarloVar**: correlated normal simulation via Cholesky factors
//! - **Backtesting**: Kupiec, Christoffersen, conditional coverage and
//!   traffic-light banding
//! - **RiskReport**: runs every model at every confidence level
//!
//! Losses are positive numbers (loss = -return). Every engine lags its
//! output by one day by default, so the value on day t only uses data
//! through t-1.
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use tailrisk::{HistoricalConfig, HistoricalVar, TimeSeries};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let index: Vec<_> = (0..30).map(|i| start + chrono::Duration::days(i)).collect();
//! let returns: Vec<f64> = (0..30).map(|i| (i as f64 * 0.9).sin() * 0.01).collect();
//! let returns = TimeSeries::new(index, returns).unwrap();
//!
//! let engine = HistoricalVar::new(HistoricalConfig {
//!     alpha: 0.95,
//!     window: 20,
//!     lagged: true,
//! })
//! .unwrap();
//!
//! let estimates = engine.estimate(&returns).unwrap();
//! // first full window ends on day 19, so day 20 is the first estimate
//! assert!(estimates.var[19].is_nan());
//! assert!(estimates.var[20] > 0.0);
//! ```

mod config;
mod error;
mod historical;
mod monte_carlo;
mod parametric;
mod portfolio;
mod report;
mod series;

pub mod backtest;
pub mod rolling;

pub use config::{EwmaConfig, MonteCarloSettings, TailRiskConfig};
pub use error::{Result, TailRiskError};
pub use historical::{HistoricalConfig, HistoricalVar};
pub use monte_carlo::{
    cholesky_with_fallback, mean_and_covariance, MonteCarloConfig, MonteCarloVar, NormalDraws,
    SeededNormalDraws, COVARIANCE_JITTER,
};
pub use parametric::{ParametricConfig, ParametricVar, VolatilityModel};
pub use portfolio::{portfolio_returns, Weights};
pub use report::{pnl_overlay, AlphaReport, ModelEstimate, ModelKind, PnlOverlay, RiskReport};
pub use series::{ReturnTable, RiskSeries, TimeSeries};
