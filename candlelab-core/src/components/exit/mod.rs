//! Exit rules: decide, once per bar, whether the open position closes.
//!
//! Each position is a two-state machine (`Open` → `Closed`). While open, the
//! driver builds an [`ExitContext`] for the current bar and asks the
//! strategy's [`ExitPolicy`]. A firing [`ExitSignal`] closes the position
//! through the ledger; the signal's `is_profit` flag is advisory and never
//! overrides the ledger's realized P&L.
//!
//! ## Concrete implementations
//!
//! - [`StopLossTakeProfit`]: fixed percentage stop and target from entry
//! - [`TakeProfitOnly`]: target only, no downside protection
//! - [`OppositePattern`]: exit when any watched pattern fires
//! - [`TimeBasedExit`]: exit after N bars
//! - [`TrailingStop`]: percentage retrace from the best close since entry

pub mod opposite_pattern;
pub mod stop_loss_take_profit;
pub mod time_based;
pub mod trailing_stop;

pub use opposite_pattern::OppositePattern;
pub use stop_loss_take_profit::{StopLossTakeProfit, TakeProfitOnly};
pub use time_based::TimeBasedExit;
pub use trailing_stop::TrailingStop;

use crate::components::signal::PatternSignal;
use crate::domain::{Bar, Position, PositionSide};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_STOP_LOSS_PCT: f64 = 2.0;
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 4.0;
pub const DEFAULT_MAX_BARS: usize = 20;
pub const DEFAULT_TRAILING_STOP_PCT: f64 = 2.0;

fn default_stop_loss_pct() -> f64 {
    DEFAULT_STOP_LOSS_PCT
}

fn default_take_profit_pct() -> f64 {
    DEFAULT_TAKE_PROFIT_PCT
}

fn default_max_bars() -> usize {
    DEFAULT_MAX_BARS
}

fn default_trailing_stop_pct() -> f64 {
    DEFAULT_TRAILING_STOP_PCT
}

/// Exit policy with its parameters. Percentages are in percent units (2.0 = 2%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitRule {
    StopLossTakeProfit {
        #[serde(default = "default_stop_loss_pct")]
        stop_loss_pct: f64,
        #[serde(default = "default_take_profit_pct")]
        take_profit_pct: f64,
    },
    TakeProfitOnly {
        #[serde(default = "default_take_profit_pct")]
        take_profit_pct: f64,
    },
    OppositePattern,
    #[serde(rename = "timebased_exit")]
    TimebasedExit {
        #[serde(default = "default_max_bars")]
        max_bars: usize,
    },
    TrailingStop {
        #[serde(default = "default_trailing_stop_pct")]
        trailing_stop_pct: f64,
    },
}

impl Default for ExitRule {
    fn default() -> Self {
        Self::StopLossTakeProfit {
            stop_loss_pct: DEFAULT_STOP_LOSS_PCT,
            take_profit_pct: DEFAULT_TAKE_PROFIT_PCT,
        }
    }
}

impl ExitRule {
    /// Every rule with default parameters, in declaration order.
    pub fn defaults() -> [ExitRule; 5] {
        [
            ExitRule::default(),
            ExitRule::TakeProfitOnly {
                take_profit_pct: DEFAULT_TAKE_PROFIT_PCT,
            },
            ExitRule::OppositePattern,
            ExitRule::TimebasedExit {
                max_bars: DEFAULT_MAX_BARS,
            },
            ExitRule::TrailingStop {
                trailing_stop_pct: DEFAULT_TRAILING_STOP_PCT,
            },
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StopLossTakeProfit { .. } => "stop_loss_take_profit",
            Self::TakeProfitOnly { .. } => "take_profit_only",
            Self::OppositePattern => "opposite_pattern",
            Self::TimebasedExit { .. } => "timebased_exit",
            Self::TrailingStop { .. } => "trailing_stop",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::StopLossTakeProfit { .. } => "Stop loss and take profit",
            Self::TakeProfitOnly { .. } => "Take profit only",
            Self::OppositePattern => "Exit on opposite pattern",
            Self::TimebasedExit { .. } => "Time-based exit after N bars",
            Self::TrailingStop { .. } => "Trailing stop loss",
        }
    }

    /// Parameter problems, one message per violation.
    pub fn validation_errors(&self) -> Vec<String> {
        let checks: Vec<(&str, f64)> = match *self {
            Self::StopLossTakeProfit {
                stop_loss_pct,
                take_profit_pct,
            } => vec![("stop loss", stop_loss_pct), ("take profit", take_profit_pct)],
            Self::TakeProfitOnly { take_profit_pct } => vec![("take profit", take_profit_pct)],
            Self::TrailingStop { trailing_stop_pct } => vec![("trailing stop", trailing_stop_pct)],
            Self::TimebasedExit { max_bars } => vec![("max bars to hold", max_bars as f64)],
            Self::OppositePattern => Vec::new(),
        };
        checks
            .into_iter()
            .filter(|(_, value)| !(value.is_finite() && *value > 0.0))
            .map(|(label, value)| format!("{label} must be positive (got {value})"))
            .collect()
    }

    /// Instantiate the policy object for this rule.
    pub fn build(&self) -> Box<dyn ExitPolicy> {
        match *self {
            Self::StopLossTakeProfit {
                stop_loss_pct,
                take_profit_pct,
            } => Box::new(StopLossTakeProfit::new(stop_loss_pct, take_profit_pct)),
            Self::TakeProfitOnly { take_profit_pct } => {
                Box::new(TakeProfitOnly::new(take_profit_pct))
            }
            Self::OppositePattern => Box::new(OppositePattern),
            Self::TimebasedExit { max_bars } => Box::new(TimeBasedExit::new(max_bars)),
            Self::TrailingStop { trailing_stop_pct } => {
                Box::new(TrailingStop::new(trailing_stop_pct))
            }
        }
    }
}

impl fmt::Display for ExitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything an exit policy may look at for one bar.
#[derive(Debug, Clone, Copy)]
pub struct ExitContext<'a> {
    pub side: PositionSide,
    pub entry_price: f64,
    /// The bar's close; exits fill here unless the policy says otherwise.
    pub current_price: f64,
    pub bars_since_entry: usize,
    pub highest_since_entry: f64,
    pub lowest_since_entry: f64,
    /// Pattern resolved for this step (from the previous bar's scores).
    pub signal: Option<&'a PatternSignal>,
}

impl<'a> ExitContext<'a> {
    pub fn new(
        position: &Position,
        bar: &Bar,
        bar_index: usize,
        signal: Option<&'a PatternSignal>,
    ) -> Self {
        Self {
            side: position.side,
            entry_price: position.entry_price,
            current_price: bar.close,
            bars_since_entry: position.bars_since_entry(bar_index),
            highest_since_entry: position.highest_since_entry,
            lowest_since_entry: position.lowest_since_entry,
            signal,
        }
    }

    /// True if the current price is on the winning side of the entry.
    pub fn in_profit(&self) -> bool {
        match self.side {
            PositionSide::Long => self.current_price > self.entry_price,
            PositionSide::Short => self.current_price < self.entry_price,
        }
    }
}

/// Verdict of one exit evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub should_exit: bool,
    /// Fill price before slippage. `None` means the current bar close.
    pub exit_price: Option<f64>,
    pub reason: String,
    /// Advisory; realized P&L decides success.
    pub is_profit: bool,
}

impl ExitSignal {
    pub fn hold() -> Self {
        Self {
            should_exit: false,
            exit_price: None,
            reason: String::new(),
            is_profit: false,
        }
    }

    pub fn exit(exit_price: f64, reason: impl Into<String>, is_profit: bool) -> Self {
        Self {
            should_exit: true,
            exit_price: Some(exit_price),
            reason: reason.into(),
            is_profit,
        }
    }

    /// Exit price, defaulting to `close`.
    pub fn price_or(&self, close: f64) -> f64 {
        self.exit_price.unwrap_or(close)
    }
}

/// Trait for exit policies.
pub trait ExitPolicy: Send + Sync {
    /// Human-readable name (e.g., "trailing_stop").
    fn name(&self) -> &str;

    /// Evaluate the open position on the current bar.
    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn ctx(side: PositionSide, entry: f64, price: f64) -> ExitContext<'static> {
        ExitContext {
            side,
            entry_price: entry,
            current_price: price,
            bars_since_entry: 1,
            highest_since_entry: entry.max(price),
            lowest_since_entry: entry.min(price),
            signal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_signal() {
        let s = ExitSignal::hold();
        assert!(!s.should_exit);
        assert_eq!(s.price_or(101.0), 101.0);
    }

    #[test]
    fn toml_style_params_default() {
        let rule: ExitRule = serde_json::from_str(r#"{"type":"stop_loss_take_profit"}"#).unwrap();
        assert_eq!(rule, ExitRule::default());

        let rule: ExitRule = serde_json::from_str(r#"{"type":"timebased_exit"}"#).unwrap();
        assert_eq!(rule, ExitRule::TimebasedExit { max_bars: 20 });
    }

    #[test]
    fn built_policy_names_match_rule_names() {
        for rule in ExitRule::defaults() {
            assert_eq!(rule.build().name(), rule.name());
        }
    }

    #[test]
    fn validation_flags_bad_params() {
        let rule = ExitRule::StopLossTakeProfit {
            stop_loss_pct: 0.0,
            take_profit_pct: -1.0,
        };
        assert_eq!(rule.validation_errors().len(), 2);
        assert_eq!(
            ExitRule::TimebasedExit { max_bars: 0 }.validation_errors().len(),
            1
        );
        assert!(ExitRule::OppositePattern.validation_errors().is_empty());
    }

    #[test]
    fn defaults_are_valid() {
        for rule in ExitRule::defaults() {
            assert!(rule.validation_errors().is_empty(), "{rule}");
        }
    }
}
