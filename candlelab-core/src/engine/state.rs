//! Per-bar equity snapshots, run results and engine errors.

use crate::domain::{BarError, TradeRecord};
use crate::engine::ledger::{Ledger, LedgerError};
use crate::strategy::ConfigError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] BarError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Account state after one processed bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub peak_equity: f64,
    pub drawdown_pct: f64,
    pub available_capital: f64,
    pub committed_capital: f64,
}

impl EquityPoint {
    pub fn from_ledger(ledger: &Ledger, bar_index: usize, timestamp: NaiveDateTime) -> Self {
        Self {
            bar_index,
            timestamp,
            equity: ledger.equity(),
            peak_equity: ledger.peak_equity(),
            drawdown_pct: ledger.drawdown_pct(),
            available_capital: ledger.available(),
            committed_capital: ledger.committed(),
        }
    }
}

/// Everything one backtest produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<TradeRecord>,
    /// One point per bar after the first.
    pub equity_curve: Vec<EquityPoint>,
    pub initial_capital: f64,
    /// Available capital after the final forced close.
    pub final_capital: f64,
    pub max_drawdown_pct: f64,
    pub bar_count: usize,
    /// Steps on which some watched pattern fired.
    pub signal_count: usize,
    pub skipped_entries: usize,
}

impl RunResult {
    /// The result of a run that never entered the loop.
    pub fn empty(initial_capital: f64, bar_count: usize) -> Self {
        Self {
            trades: Vec::new(),
            equity_curve: Vec::new(),
            initial_capital,
            final_capital: initial_capital,
            max_drawdown_pct: 0.0,
            bar_count,
            signal_count: 0,
            skipped_entries: 0,
        }
    }

    pub fn total_return_pct(&self) -> f64 {
        if self.initial_capital > 0.0 {
            (self.final_capital - self.initial_capital) / self.initial_capital * 100.0
        } else {
            0.0
        }
    }
}
