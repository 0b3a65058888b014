//! TradeRecord: a completed round-trip trade.

use super::position::PositionSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Reason tag used when the driver closes a position after the last bar.
pub const END_OF_DATA: &str = "end_of_data";

/// A closed trade: entry → exit. Created once by the ledger, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub side: PositionSide,
    pub pattern: String,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: String,

    // ── Size ──
    pub quantity: f64,
    pub committed_capital: f64,

    // ── PnL ──
    /// Realized P&L before commissions.
    pub pnl: f64,
    /// `pnl` as a percentage of `entry_price * quantity`.
    pub pnl_pct: f64,
    pub entry_commission: f64,
    pub exit_commission: f64,
    pub net_pnl: f64,
    /// `pnl > 0`. Authoritative win/loss classification.
    pub success: bool,
    /// What the exit rule believed when it fired. Advisory only.
    pub exit_flagged_profit: bool,

    // ── Duration ──
    pub bars_held: usize,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.success
    }

    pub fn total_commission(&self) -> f64 {
        self.entry_commission + self.exit_commission
    }

    /// Wall-clock holding time.
    pub fn duration(&self) -> chrono::Duration {
        self.exit_time - self.entry_time
    }
}
