//! Position and capital ledger.
//!
//! Owns available capital, the single open position, and the equity
//! watermarks. Capital moves only through `open_position`, `close_position`
//! and commissions:
//!
//! - entry: `available -= position_value + position_value * commission`
//! - exit:  `available += committed + pnl - exit_price * qty * commission`
//!
//! so across one round trip `available` changes by exactly `net_pnl`.

use crate::domain::{Position, PositionSide, TradeRecord};
use crate::strategy::StrategyConfig;
use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Internal invariant violations. Any of these aborts the run.
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("bar {bar_index}: cannot open a position while one is already open")]
    PositionAlreadyOpen { bar_index: usize },

    #[error("bar {bar_index}: cannot close a position when none is open")]
    NoOpenPosition { bar_index: usize },

    #[error("bar {bar_index}: available capital went negative ({available})")]
    NegativeCapital { bar_index: usize, available: f64 },
}

/// Why an entry was declined. Not an error: the bar simply passes.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NonPositiveSize { position_value: f64 },
    NonPositivePrice { price: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSize { position_value } => {
                write!(f, "position value {position_value} is not positive")
            }
            Self::NonPositivePrice { price } => write!(f, "fill price {price} is not positive"),
        }
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Opened,
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct Ledger {
    initial_capital: f64,
    position_size_pct: f64,
    commission: f64,
    slippage: f64,

    available: f64,
    position: Option<Position>,
    equity: f64,
    peak_equity: f64,
    drawdown_pct: f64,
    max_drawdown_pct: f64,
    total_commission: f64,
}

impl Ledger {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            position_size_pct: config.position_size_pct,
            commission: config.commission,
            slippage: config.slippage,
            available: config.initial_capital,
            position: None,
            equity: config.initial_capital,
            peak_equity: config.initial_capital,
            drawdown_pct: 0.0,
            max_drawdown_pct: 0.0,
            total_commission: 0.0,
        }
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.available = self.initial_capital;
        self.position = None;
        self.equity = self.initial_capital;
        self.peak_equity = self.initial_capital;
        self.drawdown_pct = 0.0;
        self.max_drawdown_pct = 0.0;
        self.total_commission = 0.0;
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn available(&self) -> f64 {
        self.available
    }

    /// Capital locked in the open position, 0 when flat.
    pub fn committed(&self) -> f64 {
        self.position
            .as_ref()
            .map_or(0.0, |p| p.committed_capital)
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn position_mut(&mut self) -> Option<&mut Position> {
        self.position.as_mut()
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn peak_equity(&self) -> f64 {
        self.peak_equity
    }

    pub fn drawdown_pct(&self) -> f64 {
        self.drawdown_pct
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    /// Slippage-adjusted entry fill: longs pay up, shorts sell down.
    pub fn entry_fill(&self, side: PositionSide, price: f64) -> f64 {
        match side {
            PositionSide::Long => price * (1.0 + self.slippage),
            PositionSide::Short => price * (1.0 - self.slippage),
        }
    }

    /// Slippage-adjusted exit fill, the mirror of [`Ledger::entry_fill`].
    pub fn exit_fill(&self, side: PositionSide, price: f64) -> f64 {
        match side {
            PositionSide::Long => price * (1.0 - self.slippage),
            PositionSide::Short => price * (1.0 + self.slippage),
        }
    }

    /// Open a position at `price` (before slippage).
    ///
    /// Sizing is `available * position_size_pct / 100`, capped so that the
    /// position value plus its entry commission fits in available capital.
    /// Entries with a non-positive size or fill price are skipped.
    pub fn open_position(
        &mut self,
        side: PositionSide,
        price: f64,
        bar_index: usize,
        timestamp: NaiveDateTime,
        pattern: &str,
    ) -> Result<EntryOutcome, LedgerError> {
        if self.position.is_some() {
            return Err(LedgerError::PositionAlreadyOpen { bar_index });
        }

        let requested = self.available * self.position_size_pct / 100.0;
        let capped = self.available / (1.0 + self.commission);
        // At the cap the commission is the exact remainder, so available lands on 0.
        let (position_value, entry_commission) = if requested > capped {
            (capped, self.available - capped)
        } else {
            (requested, requested * self.commission)
        };
        if !(position_value.is_finite() && position_value > 0.0) {
            return Ok(EntryOutcome::Skipped(SkipReason::NonPositiveSize {
                position_value,
            }));
        }
        let fill = self.entry_fill(side, price);
        if !(fill.is_finite() && fill > 0.0) {
            return Ok(EntryOutcome::Skipped(SkipReason::NonPositivePrice {
                price: fill,
            }));
        }

        self.available -= position_value;
        self.available -= entry_commission;
        self.total_commission += entry_commission;
        self.check_capital(bar_index)?;

        self.position = Some(Position {
            side,
            entry_bar: bar_index,
            entry_time: timestamp,
            entry_price: fill,
            quantity: position_value / fill,
            committed_capital: position_value,
            entry_commission,
            pattern: pattern.to_string(),
            highest_since_entry: fill,
            lowest_since_entry: fill,
        });
        Ok(EntryOutcome::Opened)
    }

    /// Close the open position at `price` (before slippage).
    pub fn close_position(
        &mut self,
        price: f64,
        bar_index: usize,
        timestamp: NaiveDateTime,
        reason: &str,
        exit_flagged_profit: bool,
    ) -> Result<TradeRecord, LedgerError> {
        let position = self
            .position
            .take()
            .ok_or(LedgerError::NoOpenPosition { bar_index })?;

        let exit_price = self.exit_fill(position.side, price);
        let pnl = position.pnl_at(exit_price);
        let exit_commission = exit_price * position.quantity * self.commission;

        self.available += position.committed_capital + pnl;
        self.available -= exit_commission;
        self.total_commission += exit_commission;
        self.check_capital(bar_index)?;

        let invested = position.entry_price * position.quantity;
        let pnl_pct = if invested > 0.0 {
            pnl / invested * 100.0
        } else {
            0.0
        };

        Ok(TradeRecord {
            side: position.side,
            pattern: position.pattern,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_bar: bar_index,
            exit_time: timestamp,
            exit_price,
            exit_reason: reason.to_string(),
            quantity: position.quantity,
            committed_capital: position.committed_capital,
            pnl,
            pnl_pct,
            entry_commission: position.entry_commission,
            exit_commission,
            net_pnl: pnl - position.entry_commission - exit_commission,
            success: pnl > 0.0,
            exit_flagged_profit,
            bars_held: bar_index.saturating_sub(position.entry_bar),
        })
    }

    /// Revalue at `close` and advance the peak and drawdown watermarks.
    pub fn mark_to_market(&mut self, close: f64) -> f64 {
        let unrealized = self.position.as_ref().map_or(0.0, |p| p.pnl_at(close));
        self.equity = self.available + self.committed() + unrealized;
        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }
        self.drawdown_pct = if self.peak_equity > 0.0 {
            (self.peak_equity - self.equity) / self.peak_equity * 100.0
        } else {
            0.0
        };
        if self.drawdown_pct > self.max_drawdown_pct {
            self.max_drawdown_pct = self.drawdown_pct;
        }
        self.equity
    }

    fn check_capital(&self, bar_index: usize) -> Result<(), LedgerError> {
        if self.available < 0.0 {
            Err(LedgerError::NegativeCapital {
                bar_index,
                available: self.available,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn ledger(commission: f64, slippage: f64) -> Ledger {
        let config = StrategyConfig::new("test", vec!["CDLHAMMER".into()])
            .with_frictions(commission, slippage);
        Ledger::new(&config)
    }

    #[test]
    fn entry_deducts_position_value_and_commission() {
        let mut l = ledger(0.001, 0.001);
        let outcome = l
            .open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        assert_eq!(outcome, EntryOutcome::Opened);
        assert!((l.available() - (1_000_000.0 - 100_000.0 - 100.0)).abs() < 1e-6);
        assert_eq!(l.committed(), 100_000.0);

        let pos = l.position().unwrap();
        assert!((pos.entry_price - 100.1).abs() < 1e-9);
        assert!((pos.quantity * pos.entry_price - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn short_entry_fills_below_price() {
        let mut l = ledger(0.0, 0.01);
        l.open_position(PositionSide::Short, 100.0, 1, ts(2), "CDLENGULFING")
            .unwrap();
        assert!((l.position().unwrap().entry_price - 99.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_conserves_capital() {
        let mut l = ledger(0.001, 0.0005);
        let before = l.available();
        l.open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        let trade = l.close_position(106.0, 4, ts(5), "take profit reached", true)
            .unwrap();
        assert!((l.available() - before - trade.net_pnl).abs() < 1e-6);
        assert!((l.total_commission() - trade.total_commission()).abs() < 1e-9);
        assert_eq!(trade.bars_held, 3);
        assert!(trade.success);
    }

    #[test]
    fn frictionless_long_pnl_pct() {
        let mut l = ledger(0.0, 0.0);
        l.open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        let trade = l.close_position(104.5, 2, ts(3), "take profit reached", true)
            .unwrap();
        assert!((trade.pnl_pct - 4.5).abs() < 1e-9);
    }

    #[test]
    fn short_loss_is_not_success() {
        let mut l = ledger(0.0, 0.0);
        l.open_position(PositionSide::Short, 100.0, 1, ts(2), "CDLENGULFING")
            .unwrap();
        let trade = l.close_position(103.0, 2, ts(3), "stop loss triggered", false)
            .unwrap();
        assert!(trade.pnl < 0.0);
        assert!(!trade.success);
    }

    #[test]
    fn double_open_is_fatal() {
        let mut l = ledger(0.0, 0.0);
        l.open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        let err = l
            .open_position(PositionSide::Long, 100.0, 2, ts(3), "CDLHAMMER")
            .unwrap_err();
        assert_eq!(err, LedgerError::PositionAlreadyOpen { bar_index: 2 });
    }

    #[test]
    fn close_without_position_is_fatal() {
        let mut l = ledger(0.0, 0.0);
        let err = l.close_position(100.0, 3, ts(4), "x", false).unwrap_err();
        assert_eq!(err, LedgerError::NoOpenPosition { bar_index: 3 });
    }

    #[test]
    fn full_size_entry_leaves_room_for_commission() {
        let config = StrategyConfig::new("all_in", vec!["CDLHAMMER".into()])
            .with_sizing(1_000.0, 100.0)
            .with_frictions(0.01, 0.0);
        let mut l = Ledger::new(&config);
        let outcome = l
            .open_position(PositionSide::Long, 10.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        assert_eq!(outcome, EntryOutcome::Opened);

        let committed = l.committed();
        assert!((committed - 1_000.0 / 1.01).abs() < 1e-9);
        assert!((committed * 1.01 - 1_000.0).abs() < 1e-9);
        assert_eq!(l.available(), 0.0);
    }

    #[test]
    fn partial_size_is_not_capped() {
        let config = StrategyConfig::new("half", vec!["CDLHAMMER".into()])
            .with_sizing(1_000.0, 50.0)
            .with_frictions(0.01, 0.0);
        let mut l = Ledger::new(&config);
        l.open_position(PositionSide::Long, 10.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        assert_eq!(l.committed(), 500.0);
        assert!((l.available() - 495.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_price_is_skipped() {
        let mut l = ledger(0.0, 0.0);
        let outcome = l
            .open_position(PositionSide::Long, 0.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        assert_eq!(
            outcome,
            EntryOutcome::Skipped(SkipReason::NonPositivePrice { price: 0.0 })
        );
    }

    #[test]
    fn drawdown_watermarks_ratchet() {
        let mut l = ledger(0.0, 0.0);
        l.open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        l.mark_to_market(110.0);
        let peak = l.peak_equity();
        assert!((peak - 1_010_000.0).abs() < 1e-6);

        l.mark_to_market(90.0);
        let dd = l.drawdown_pct();
        assert!(dd > 0.0);
        assert_eq!(l.max_drawdown_pct(), dd);

        l.mark_to_market(105.0);
        assert_eq!(l.peak_equity(), peak);
        assert!(l.drawdown_pct() < dd);
        assert_eq!(l.max_drawdown_pct(), dd);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut l = ledger(0.001, 0.0);
        l.open_position(PositionSide::Long, 100.0, 1, ts(2), "CDLHAMMER")
            .unwrap();
        l.mark_to_market(80.0);
        l.reset();
        assert_eq!(l.available(), 1_000_000.0);
        assert_eq!(l.equity(), 1_000_000.0);
        assert_eq!(l.max_drawdown_pct(), 0.0);
        assert_eq!(l.total_commission(), 0.0);
        assert!(!l.has_position());
    }
}
