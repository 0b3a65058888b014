//! Integration tests for the runner: TOML config + CSV bars → BacktestResult.
//!
//! Uses a small hand-built bar file whose trades can be worked out on paper:
//! a bullish hammer that hits take profit, then a bearish hammer whose short
//! hits take profit.

use candlelab_core::domain::PositionSide;
use candlelab_runner::config::BacktestConfig;
use candlelab_runner::data_loader::LoadedData;
use candlelab_runner::metrics::ProfitFactor;
use candlelab_runner::runner::{run_backtest_from_data, run_from_config, DataOverride, RunError};
use std::path::{Path, PathBuf};

const BARS_CSV: &str = "\
date,open,high,low,close,volume,CDLHAMMER,CDLDOJI
2024-01-02,100.0,100.5,99.5,100.0,1000,100,0
2024-01-03,100.0,101.5,99.5,101.0,1000,0,0
2024-01-04,101.0,105.0,100.5,104.5,1000,0,100
2024-01-05,104.5,105.0,103.5,104.0,1000,-100,0
2024-01-08,104.0,104.5,101.5,102.0,1000,0,0
2024-01-09,102.0,102.5,99.5,99.5,1000,0,0
";

const FLAT_CSV: &str = "\
date,open,high,low,close,volume,CDLHAMMER
2024-01-02,100,101,99,100,1000,0
2024-01-03,100,101,99,100,1000,0
2024-01-04,100,101,99,100,1000,0
";

fn strategy_toml(bars_path: &str) -> String {
    format!(
        r#"
[strategy]
name = "hammer_reversal"
patterns = ["CDLHAMMER"]
entry_rule = "open_next_candle"
commission = 0.0
slippage = 0.0

[strategy.exit_rule]
type = "stop_loss_take_profit"
stop_loss_pct = 2.0
take_profit_pct = 4.0

[data]
bars_path = "{bars_path}"
symbol = "TEST"
"#
    )
}

/// Write the bars and a config pointing at them; returns the config path.
fn write_fixture(dir: &Path, csv: &str) -> PathBuf {
    std::fs::write(dir.join("bars.csv"), csv).unwrap();
    let config_path = dir.join("strategy.toml");
    std::fs::write(&config_path, strategy_toml("bars.csv")).unwrap();
    config_path
}

#[test]
fn hand_worked_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_fixture(dir.path(), BARS_CSV)).unwrap();
    let result = run_from_config(&config, &DataOverride::default()).unwrap();

    assert_eq!(result.symbol, "TEST");
    assert_eq!(result.bar_count, 6);
    assert_eq!(result.start_date, "2024-01-02 00:00:00");
    assert_eq!(result.end_date, "2024-01-09 00:00:00");
    assert!(!result.has_synthetic);
    assert_eq!(result.equity_curve.len(), 5);

    assert_eq!(result.trades.len(), 2);
    let long = &result.trades[0];
    assert_eq!(long.side, PositionSide::Long);
    assert_eq!((long.entry_bar, long.exit_bar), (1, 2));
    assert_eq!(long.entry_price, 100.0);
    assert_eq!(long.exit_reason, "take profit reached");
    assert!((long.pnl_pct - 4.5).abs() < 1e-9);

    let short = &result.trades[1];
    assert_eq!(short.side, PositionSide::Short);
    assert_eq!((short.entry_bar, short.exit_bar), (4, 5));
    assert_eq!(short.entry_price, 104.0);
    assert_eq!(short.exit_price, 99.5);

    // CDLDOJI on bar 2 is not watched.
    assert!(result.trades.iter().all(|t| t.pattern == "CDLHAMMER"));

    let m = &result.metrics;
    assert_eq!(m.total_trades, 2);
    assert_eq!((m.long_trades, m.short_trades), (1, 1));
    assert_eq!(m.win_rate, 1.0);
    assert_eq!(m.profit_factor, ProfitFactor::Infinite);
    assert_eq!(m.max_consecutive_wins, 2);
    assert_eq!(m.pattern_breakdown["CDLHAMMER"].count, 2);

    let net: f64 = result.trades.iter().map(|t| t.net_pnl).sum();
    assert!((result.final_capital - (result.initial_capital + net)).abs() < 1e-6);
    assert!((m.total_return_pct - net / result.initial_capital * 100.0).abs() < 1e-9);
}

#[test]
fn zero_trades_give_zeroed_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_fixture(dir.path(), FLAT_CSV)).unwrap();
    let result = run_from_config(&config, &DataOverride::default()).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.metrics.total_trades, 0);
    assert_eq!(result.metrics.win_rate, 0.0);
    assert_eq!(result.metrics.profit_factor, ProfitFactor::Undefined);
    assert_eq!(result.final_capital, result.initial_capital);
}

#[test]
fn bars_override_wins_over_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_fixture(dir.path(), FLAT_CSV)).unwrap();

    let other = dir.path().join("other.csv");
    std::fs::write(&other, BARS_CSV).unwrap();
    let data = DataOverride {
        bars_path: Some(other),
        ..Default::default()
    };
    let result = run_from_config(&config, &data).unwrap();
    assert_eq!(result.trades.len(), 2);
}

#[test]
fn missing_bars_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("strategy.toml");
    std::fs::write(&config_path, strategy_toml("nowhere.csv")).unwrap();
    let config = BacktestConfig::from_file(&config_path).unwrap();

    let err = run_from_config(&config, &DataOverride::default()).unwrap_err();
    assert!(matches!(err, RunError::Data(_)));
}

#[test]
fn fingerprints_are_stable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_fixture(dir.path(), BARS_CSV)).unwrap();
    let a = run_from_config(&config, &DataOverride::default()).unwrap();
    let b = run_from_config(&config, &DataOverride::default()).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.dataset_hash.len(), 64);
    assert_eq!(a.config_hash, config.strategy.config_hash().to_string());
}

#[test]
fn synthetic_runs_are_deterministic_per_seed() {
    let config = BacktestConfig::from_toml(&strategy_toml("unused.csv")).unwrap();
    let data = |seed| DataOverride {
        synthetic_bars: Some(400),
        seed,
        ..Default::default()
    };

    let a = run_from_config(&config, &data(5)).unwrap();
    let b = run_from_config(&config, &data(5)).unwrap();
    let c = run_from_config(&config, &data(6)).unwrap();

    assert!(a.has_synthetic);
    assert_eq!(a, b);
    assert_ne!(a.dataset_hash, c.dataset_hash);
}

#[test]
fn preloaded_data_matches_file_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_fixture(dir.path(), BARS_CSV)).unwrap();
    let from_file = run_from_config(&config, &DataOverride::default()).unwrap();

    let loaded = LoadedData::from_csv(&dir.path().join("bars.csv")).unwrap();
    let from_data = run_backtest_from_data(
        &config.strategy,
        &loaded.bars,
        "TEST",
        &loaded.dataset_hash,
        loaded.has_synthetic,
    )
    .unwrap();
    assert_eq!(from_file, from_data);
}
