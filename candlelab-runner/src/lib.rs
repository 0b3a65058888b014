//! CandleLab Runner: backtest orchestration, data loading, metrics, artifacts.
//!
//! This crate builds on `candlelab-core` to provide:
//! - TOML backtest configuration
//! - CSV bar loading with a seeded synthetic fallback
//! - Single-backtest runner with fingerprints and metrics
//! - JSON, CSV and Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, DataConfig};
pub use data_loader::{dataset_hash, load_bars_csv, parse_bars_csv, LoadError, LoadedData};
pub use metrics::{MetricsBundle, PatternStats, ProfitFactor};
pub use runner::{
    run_backtest_from_data, run_from_config, BacktestResult, DataOverride, RunError,
    SCHEMA_VERSION,
};
pub use synthetic::generate_synthetic_bars;
