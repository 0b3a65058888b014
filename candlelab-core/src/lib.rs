//! CandleLab Core: domain types, strategy rules, ledger and bar loop.
//!
//! This crate contains the heart of the candlestick backtester:
//! - Domain types (bars, positions, trades)
//! - Strategy configuration with validation and BLAKE3 fingerprints
//! - Signal resolver, entry rules and exit rules
//! - Capital ledger with drawdown watermarks
//! - Single-pass bar loop with injected observers

pub mod components;
pub mod domain;
pub mod engine;
pub mod strategy;

pub use components::{EntryRule, ExitRule};
pub use domain::{Bar, BarTable, TradeRecord};
pub use engine::{run_backtest, Backtester, EquityPoint, RunResult};
pub use strategy::{ConfigError, StrategyConfig, Timeframe};
