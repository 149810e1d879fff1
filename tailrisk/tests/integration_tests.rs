//! Integration tests for estimation and backtesting
//!
//! These tests run complete pipelines from a return table to backtest
//! tables, and check the documented end-to-end scenarios.

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use tailrisk::backtest::{
    christoffersen_independence, kupiec_pof, summarize_backtest, traffic_light, HitSeries,
    TrafficLight,
};
use tailrisk::{
    portfolio_returns, HistoricalConfig, HistoricalVar, ModelKind, MonteCarloConfig,
    MonteCarloVar, ReturnTable, RiskReport, TailRiskConfig, TailRiskError, TimeSeries, Weights,
};

fn trading_days(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// Deterministic pseudo-returns with some volatility clustering
fn synthetic_table(n: usize) -> ReturnTable {
    let wave = |i: usize, freq: f64, scale: f64| {
        let regime = if (i / 60) % 2 == 0 { 1.0 } else { 2.0 };
        (i as f64 * freq).sin() * scale * regime
    };
    ReturnTable::from_columns(
        trading_days(n),
        vec![
            ("AAPL".to_string(), (0..n).map(|i| wave(i, 0.91, 0.012)).collect()),
            ("MSFT".to_string(), (0..n).map(|i| wave(i, 1.37, 0.010)).collect()),
            ("BA".to_string(), (0..n).map(|i| wave(i, 2.11, 0.020)).collect()),
        ],
    )
    .unwrap()
}

#[test]
fn test_portfolio_scenario() {
    let table = ReturnTable::from_columns(
        trading_days(3),
        vec![
            ("A".to_string(), vec![0.01, -0.02, 0.015]),
            ("B".to_string(), vec![-0.005, 0.01, -0.01]),
        ],
    )
    .unwrap();
    let weights: Weights = [("A", 0.6), ("B", 0.4)].into_iter().collect();

    let r = portfolio_returns(&table, &weights).unwrap();

    let expected = [0.004, -0.008, 0.005];
    for (got, want) in r.values().iter().zip(expected) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
    }
}

#[test]
fn test_small_sample_backtest_scenario() {
    let pattern = [0, 0, 0, 1, 0, 0, 1, 0, 0, 0];
    let hits = HitSeries::from_hits(pattern.iter().map(|&h| h == 1).collect());

    let uc = kupiec_pof(&hits, 0.99);
    assert_eq!(uc.exceedances, 2);
    assert_abs_diff_eq!(uc.expected_exceedances, 0.1, epsilon = 1e-12);
    assert_eq!(traffic_light(uc.exceedances, hits.len(), 0.99), TrafficLight::NotApplicable);

    let ind = christoffersen_independence(&hits);
    assert_eq!(ind.transitions.n11, 0);
    assert!(ind.statistic.is_finite());
}

#[test]
fn test_full_report() {
    let table = synthetic_table(400);
    let weights: Weights = [("AAPL", 0.5), ("MSFT", 0.3), ("BA", 0.2)].into_iter().collect();
    let config = TailRiskConfig {
        window: 100,
        monte_carlo: tailrisk::MonteCarloSettings {
            n_simulations: 1_000,
            seed: 42,
        },
        ..TailRiskConfig::new(weights)
    };

    let report = RiskReport::run(&config, &table).unwrap();

    assert_eq!(report.portfolio_returns.len(), 400);
    assert_eq!(report.alphas.len(), 2);

    for alpha_report in &report.alphas {
        assert_eq!(alpha_report.estimates.len(), 4);
        assert_eq!(alpha_report.backtests.len(), 4);

        for model in ModelKind::ALL {
            let label = model.label(alpha_report.alpha);
            let row = alpha_report.backtests.get(&label).unwrap();
            assert!(row.observations > 0);
            assert!(row.observations <= 300);
            assert!(row.kupiec_lr >= -1e-9);
            assert!(row.kupiec_p >= 0.0 && row.kupiec_p <= 1.0);
            assert_abs_diff_eq!(
                row.expected_exceedances,
                (1.0 - alpha_report.alpha) * row.observations as f64,
                epsilon = 1e-9
            );
        }

        let hs = alpha_report.estimate(ModelKind::HistoricalSimulation).unwrap();
        // window of 100 plus the one-day lag
        assert!(hs.series.var[..100].iter().all(|v| v.is_nan()));
        assert!(hs.series.var[100..].iter().all(|v| v.is_finite()));

        let overlay = alpha_report
            .pnl_overlay(&report.portfolio_returns, ModelKind::HistoricalSimulation)
            .unwrap();
        assert_eq!(overlay.negative_var.len(), 4);
        assert!(overlay.index.len() <= 300);
    }

    let at_99 = report.alpha(0.99).unwrap();
    let hs_row = at_99.backtests.get("HS (99%)").unwrap();
    assert_eq!(
        hs_row.traffic_light,
        traffic_light(hs_row.exceedances, hs_row.observations, 0.99)
    );
}

#[test]
fn test_report_is_reproducible() {
    let table = synthetic_table(150);
    let weights: Weights = [("AAPL", 1.0), ("MSFT", 1.0), ("BA", 2.0)].into_iter().collect();
    let mut config = TailRiskConfig::new(weights);
    config.window = 50;
    config.alpha_levels = vec![0.99];
    config.monte_carlo.n_simulations = 500;

    let first = RiskReport::run(&config, &table).unwrap();
    let second = RiskReport::run(&config, &table).unwrap();

    let mc = |r: &RiskReport| {
        r.alphas[0]
            .estimate(ModelKind::MonteCarlo)
            .unwrap()
            .series
            .var
            .iter()
            .map(|v| v.to_bits())
            .collect::<Vec<_>>()
    };
    assert_eq!(mc(&first), mc(&second));
    assert_eq!(first.alphas[0].backtests, second.alphas[0].backtests);
}

#[test]
fn test_window_longer_than_history() {
    let table = synthetic_table(30);
    let weights: Weights = [("AAPL", 1.0)].into_iter().collect();
    let returns = portfolio_returns(&table, &weights).unwrap();

    let hs = HistoricalVar::new(HistoricalConfig {
        alpha: 0.99,
        window: 100,
        lagged: true,
    })
    .unwrap()
    .estimate(&returns)
    .unwrap();
    assert!(hs.var.iter().all(|v| v.is_nan()));

    let mc = MonteCarloVar::new(MonteCarloConfig {
        window: 100,
        n_simulations: 100,
        ..Default::default()
    })
    .unwrap()
    .estimate(&table, &weights)
    .unwrap();
    assert!(mc.var.iter().all(|v| v.is_nan()));

    // Nothing to backtest against
    let err = summarize_backtest(&returns, &hs.var_series(), 0.99, "HS (99%)").unwrap_err();
    assert!(matches!(err, TailRiskError::MisalignedSeries(_)));

    // The full run surfaces the same condition
    let mut config = TailRiskConfig::new(weights);
    config.window = 100;
    assert!(matches!(
        RiskReport::run(&config, &table),
        Err(TailRiskError::MisalignedSeries(_))
    ));
}

#[test]
fn test_zero_weights_surface() {
    let table = synthetic_table(10);
    let weights: Weights = [("AAPL", 0.0), ("MSFT", 0.0)].into_iter().collect();

    assert!(matches!(
        portfolio_returns(&table, &weights),
        Err(TailRiskError::InvalidWeights(_))
    ));
    assert!(MonteCarloVar::new(MonteCarloConfig::default())
        .unwrap()
        .estimate(&table, &weights)
        .is_err());
}

#[test]
fn test_config_driven_run() {
    let yaml = r#"
weights:
  AAPL: 25
  MSFT: 25
  BA: 50
alpha_levels: [0.95]
window: 60
monte_carlo:
  n_simulations: 300
"#;
    let config = TailRiskConfig::from_yaml(yaml).unwrap();
    let report = RiskReport::run(&config, &synthetic_table(120)).unwrap();

    let table = &report.alphas[0].backtests;
    assert!(table.get("Parametric-EWMA (95%)").is_some());
    let json = table.to_json().unwrap();
    assert!(json.contains("MonteCarlo (95%)"));
}

#[test]
fn test_lagged_backtest_uses_prior_day_estimate() {
    // A single huge loss on day 20 must be an exceedance: the VaR attributed
    // to day 20 is computed from days 0..=19 only
    let mut values = vec![0.001; 40];
    for (i, v) in values.iter_mut().enumerate() {
        if i % 2 == 1 {
            *v = -0.002;
        }
    }
    values[20] = -0.5;
    let returns = TimeSeries::new(trading_days(40), values).unwrap();

    let var = HistoricalVar::new(HistoricalConfig {
        alpha: 0.99,
        window: 10,
        lagged: true,
    })
    .unwrap()
    .estimate(&returns)
    .unwrap();

    let row = summarize_backtest(&returns, &var.var_series(), 0.99, "HS (99%)").unwrap();
    assert!(row.exceedances >= 1);
    assert!(var.var[20] < 0.5);
}
