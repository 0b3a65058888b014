//! Backtest runner: wires together config, data, engine, and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: loads bars from the config's CSV (or synthetic
//!   bars), then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. No I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use candlelab_core::domain::{BarTable, TradeRecord};
use candlelab_core::engine::{run_backtest, EngineError, EquityPoint};
use candlelab_core::strategy::StrategyConfig;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{LoadError, LoadedData};
use crate::metrics::MetricsBundle;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no bars: set data.bars_path in the config, pass --bars, or use --synthetic")]
    NoDataSource,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub metrics: MetricsBundle,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub config: StrategyConfig,
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub dataset_hash: String,
    /// Structural fingerprint: patterns, entry rule and exit rule.
    pub config_hash: String,
    pub has_synthetic: bool,
    pub signal_count: usize,
    pub skipped_entries: usize,
    pub bar_count: usize,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where the runner gets its bars when the config is not enough.
#[derive(Debug, Clone, Default)]
pub struct DataOverride {
    /// Replaces `data.bars_path`.
    pub bars_path: Option<std::path::PathBuf>,
    /// Generate this many synthetic bars instead of reading a file.
    pub synthetic_bars: Option<usize>,
    pub seed: u64,
}

/// Resolve the data source for `config` and run it.
///
/// Synthetic bars win over any file; an override path wins over the
/// config's `bars_path`.
pub fn run_from_config(
    config: &BacktestConfig,
    data: &DataOverride,
) -> Result<BacktestResult, RunError> {
    let loaded = if let Some(count) = data.synthetic_bars {
        tracing::warn!(count, seed = data.seed, "using synthetic bars");
        LoadedData::synthetic(data.seed, count, &config.strategy.patterns)?
    } else {
        let path = data
            .bars_path
            .as_ref()
            .or(config.data.bars_path.as_ref())
            .ok_or(RunError::NoDataSource)?;
        LoadedData::from_csv(path)?
    };

    run_backtest_from_data(
        &config.strategy,
        &loaded.bars,
        config.symbol(),
        &loaded.dataset_hash,
        loaded.has_synthetic,
    )
}

/// Run a backtest with pre-loaded bars.
pub fn run_backtest_from_data(
    strategy_config: &StrategyConfig,
    bars: &BarTable,
    symbol: &str,
    dataset_hash: &str,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    let result = run_backtest(bars, strategy_config)?;

    let metrics = MetricsBundle::compute(
        &result.trades,
        &result.equity_curve,
        result.initial_capital,
        result.final_capital,
    );

    let start_date = bars
        .first()
        .map(|b| b.timestamp.to_string())
        .unwrap_or_default();
    let end_date = bars
        .last()
        .map(|b| b.timestamp.to_string())
        .unwrap_or_default();

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        metrics,
        trades: result.trades,
        equity_curve: result.equity_curve,
        config: strategy_config.clone(),
        symbol: symbol.to_string(),
        start_date,
        end_date,
        initial_capital: result.initial_capital,
        final_capital: result.final_capital,
        dataset_hash: dataset_hash.to_string(),
        config_hash: strategy_config.config_hash().to_string(),
        has_synthetic,
        signal_count: result.signal_count,
        skipped_entries: result.skipped_entries,
        bar_count: result.bar_count,
    })
}
