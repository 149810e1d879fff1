//! Full estimation and backtest run on a synthetic five-stock portfolio
//!
//! Run with: cargo run --example backtest_portfolio
//! Set RUST_LOG=debug for per-stage logging.

use chrono::NaiveDate;
use tailrisk::{
    ModelKind, MonteCarloConfig, MonteCarloVar, ReturnTable, RiskReport, TailRiskConfig,
};

const CONFIG: &str = r#"
weights:
  AAPL: 0.25
  MSFT: 0.25
  AMZN: 0.25
  TSM: 0.15
  BA: 0.10
alpha_levels: [0.95, 0.99]
window: 250
monte_carlo:
  n_simulations: 5000
  seed: 42
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Rolling VaR / ES Backtest ===\n");

    let config = TailRiskConfig::from_yaml(CONFIG)?;
    let table = synthetic_returns(&config, 600)?;
    println!(
        "Return table: {} days x {} instruments\n",
        table.num_days(),
        table.num_instruments()
    );

    let report = RiskReport::run(&config, &table)?;

    for alpha_report in &report.alphas {
        println!("## Confidence level {:.1}%", alpha_report.alpha * 100.0);
        println!(
            "  {:<24} {:>5} {:>5} {:>7} {:>9} {:>9} {:>9}  {}",
            "Method", "T", "x", "E[x]", "p(UC)", "p(IND)", "p(CC)", "Zone"
        );
        for row in alpha_report.backtests.rows() {
            println!(
                "  {:<24} {:>5} {:>5} {:>7.2} {:>9.4} {:>9.4} {:>9.4}  {}",
                row.method,
                row.observations,
                row.exceedances,
                row.expected_exceedances,
                row.kupiec_p,
                row.christoffersen_p,
                row.lr_cc_p,
                row.traffic_light
            );
        }

        let overlay = alpha_report
            .pnl_overlay(&report.portfolio_returns, ModelKind::HistoricalSimulation)?;
        println!(
            "  HS exceedance days in overlay: {} of {}\n",
            overlay.exceedance_days.len(),
            overlay.index.len()
        );
    }

    println!("## Latest simulated loss distribution (99%)");
    let engine = MonteCarloVar::new(MonteCarloConfig {
        alpha: 0.99,
        window: config.window,
        n_simulations: config.monte_carlo.n_simulations,
        seed: config.monte_carlo.seed,
        lagged: config.lagged,
    })?;
    let mut losses = engine.latest_loss_distribution(&table, &config.weights)?;
    losses.sort_by(f64::total_cmp);
    let pick = |q: f64| losses[((losses.len() - 1) as f64 * q) as usize];
    println!("  median loss: {:.4}%", pick(0.5) * 100.0);
    println!("  95th pct:    {:.4}%", pick(0.95) * 100.0);
    println!("  99th pct:    {:.4}%", pick(0.99) * 100.0);

    println!("\n=== Done ===");
    Ok(())
}

/// Returns with a calm and a stressed regime, plus a few missing quotes
fn synthetic_returns(
    config: &TailRiskConfig,
    days: usize,
) -> Result<ReturnTable, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2021, 1, 4).ok_or("invalid start date")?;
    let index = (0..days)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();

    let columns = ["AAPL", "MSFT", "AMZN", "TSM", "BA"]
        .iter()
        .enumerate()
        .filter(|(_, name)| config.weights.get(name).is_some())
        .map(|(k, name)| {
            let freq = 0.53 + 0.41 * k as f64;
            let values = (0..days)
                .map(|i| {
                    if (i + 7 * k) % 173 == 0 {
                        return f64::NAN;
                    }
                    let regime = if (i / 150) % 2 == 1 { 2.5 } else { 1.0 };
                    let common = (i as f64 * 0.23).sin() * 0.006;
                    let own = (i as f64 * freq).sin() * 0.009;
                    (common + own) * regime - 0.0002
                })
                .collect();
            (name.to_string(), values)
        })
        .collect();

    Ok(ReturnTable::from_columns(index, columns)?)
}
