use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1.0 for long, -1.0 for short. Multiplies a price move into P&L.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// The single open position held by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub quantity: f64,
    /// Capital locked for the trade's duration (pre-slippage position value).
    pub committed_capital: f64,
    pub entry_commission: f64,
    pub pattern: String,
    /// Highest close seen since entry (entry price included).
    pub highest_since_entry: f64,
    /// Lowest close seen since entry (entry price included).
    pub lowest_since_entry: f64,
}

impl Position {
    /// P&L of the position if it were closed at `price` (no frictions).
    pub fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.side.sign() * self.quantity
    }

    /// Advance the running extremes with a new close.
    pub fn observe_close(&mut self, close: f64) {
        if close > self.highest_since_entry {
            self.highest_since_entry = close;
        }
        if close < self.lowest_since_entry {
            self.lowest_since_entry = close;
        }
    }

    pub fn bars_since_entry(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }
}
