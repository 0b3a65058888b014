//! Engine observers: the only path from the bar loop to logging.
//!
//! The driver reports lifecycle events to an injected [`EngineObserver`].
//! The core holds no global logger; callers pick [`TracingObserver`] to emit
//! `tracing` events or [`NullObserver`] to stay silent.

use crate::domain::{Position, TradeRecord};
use crate::engine::ledger::SkipReason;
use tracing::{debug, info, warn};

/// Receives engine lifecycle events. Every method defaults to a no-op.
pub trait EngineObserver: Send + Sync {
    fn on_run_start(&self, _strategy: &str, _bar_count: usize, _initial_capital: f64) {}

    fn on_entry(&self, _position: &Position, _available_after: f64) {}

    fn on_entry_skipped(&self, _bar_index: usize, _reason: &SkipReason) {}

    fn on_exit(&self, _trade: &TradeRecord) {}

    fn on_run_complete(&self, _trade_count: usize, _final_equity: f64, _max_drawdown_pct: f64) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl EngineObserver for NullObserver {}

/// Forwards events to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_run_start(&self, strategy: &str, bar_count: usize, initial_capital: f64) {
        info!(strategy, bar_count, initial_capital, "backtest started");
    }

    fn on_entry(&self, position: &Position, available_after: f64) {
        debug!(
            bar = position.entry_bar,
            side = %position.side,
            pattern = %position.pattern,
            price = position.entry_price,
            quantity = position.quantity,
            available_after,
            "position opened"
        );
    }

    fn on_entry_skipped(&self, bar_index: usize, reason: &SkipReason) {
        warn!(bar = bar_index, %reason, "entry skipped");
    }

    fn on_exit(&self, trade: &TradeRecord) {
        debug!(
            bar = trade.exit_bar,
            side = %trade.side,
            pattern = %trade.pattern,
            price = trade.exit_price,
            pnl = trade.pnl,
            reason = %trade.exit_reason,
            "position closed"
        );
    }

    fn on_run_complete(&self, trade_count: usize, final_equity: f64, max_drawdown_pct: f64) {
        info!(trade_count, final_equity, max_drawdown_pct, "backtest complete");
    }
}
