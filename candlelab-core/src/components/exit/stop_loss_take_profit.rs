//! Fixed percentage exits measured from the entry price.
//!
//! Long: target at `entry * (1 + tp)`, stop at `entry * (1 - sl)`.
//! Short: mirrored. The target is checked before the stop.

use crate::domain::PositionSide;

use super::{ExitContext, ExitPolicy, ExitSignal};

pub const TAKE_PROFIT_REASON: &str = "take profit reached";
pub const STOP_LOSS_REASON: &str = "stop loss triggered";

/// Stop loss plus take profit.
#[derive(Debug, Clone)]
pub struct StopLossTakeProfit {
    /// Fraction, e.g. 0.02 for 2%.
    pub stop_loss: f64,
    /// Fraction, e.g. 0.04 for 4%.
    pub take_profit: f64,
}

impl StopLossTakeProfit {
    /// Build from percent units (2.0 = 2%).
    pub fn new(stop_loss_pct: f64, take_profit_pct: f64) -> Self {
        Self {
            stop_loss: stop_loss_pct / 100.0,
            take_profit: take_profit_pct / 100.0,
        }
    }
}

impl ExitPolicy for StopLossTakeProfit {
    fn name(&self) -> &str {
        "stop_loss_take_profit"
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        if let Some(signal) = take_profit(ctx, self.take_profit) {
            return signal;
        }
        let stopped = match ctx.side {
            PositionSide::Long => ctx.current_price <= ctx.entry_price * (1.0 - self.stop_loss),
            PositionSide::Short => ctx.current_price >= ctx.entry_price * (1.0 + self.stop_loss),
        };
        if stopped {
            ExitSignal::exit(ctx.current_price, STOP_LOSS_REASON, false)
        } else {
            ExitSignal::hold()
        }
    }
}

/// Take profit with no stop. Losses are unbounded until the data ends.
#[derive(Debug, Clone)]
pub struct TakeProfitOnly {
    pub take_profit: f64,
}

impl TakeProfitOnly {
    pub fn new(take_profit_pct: f64) -> Self {
        Self {
            take_profit: take_profit_pct / 100.0,
        }
    }
}

impl ExitPolicy for TakeProfitOnly {
    fn name(&self) -> &str {
        "take_profit_only"
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        take_profit(ctx, self.take_profit).unwrap_or_else(ExitSignal::hold)
    }
}

fn take_profit(ctx: &ExitContext<'_>, take_profit: f64) -> Option<ExitSignal> {
    let reached = match ctx.side {
        PositionSide::Long => ctx.current_price >= ctx.entry_price * (1.0 + take_profit),
        PositionSide::Short => ctx.current_price <= ctx.entry_price * (1.0 - take_profit),
    };
    reached.then(|| ExitSignal::exit(ctx.current_price, TAKE_PROFIT_REASON, true))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ctx;
    use super::*;

    #[test]
    fn long_take_profit() {
        let pm = StopLossTakeProfit::new(2.0, 4.0);
        let signal = pm.evaluate(&ctx(PositionSide::Long, 100.0, 104.5));
        assert!(signal.should_exit);
        assert_eq!(signal.reason, TAKE_PROFIT_REASON);
        assert_eq!(signal.exit_price, Some(104.5));
        assert!(signal.is_profit);
    }

    #[test]
    fn long_stop_loss() {
        let pm = StopLossTakeProfit::new(2.0, 4.0);
        let signal = pm.evaluate(&ctx(PositionSide::Long, 100.0, 97.9));
        assert!(signal.should_exit);
        assert_eq!(signal.reason, STOP_LOSS_REASON);
        assert!(!signal.is_profit);
    }

    #[test]
    fn long_holds_inside_band() {
        let pm = StopLossTakeProfit::new(2.0, 4.0);
        assert!(!pm.evaluate(&ctx(PositionSide::Long, 100.0, 103.0)).should_exit);
        assert!(!pm.evaluate(&ctx(PositionSide::Long, 100.0, 98.5)).should_exit);
    }

    #[test]
    fn short_is_mirrored() {
        let pm = StopLossTakeProfit::new(2.0, 4.0);
        let tp = pm.evaluate(&ctx(PositionSide::Short, 100.0, 95.0));
        assert_eq!(tp.reason, TAKE_PROFIT_REASON);
        let sl = pm.evaluate(&ctx(PositionSide::Short, 100.0, 102.5));
        assert_eq!(sl.reason, STOP_LOSS_REASON);
        assert!(!pm.evaluate(&ctx(PositionSide::Short, 100.0, 101.0)).should_exit);
    }

    #[test]
    fn take_profit_only_never_stops_out() {
        let pm = TakeProfitOnly::new(4.0);
        assert!(!pm.evaluate(&ctx(PositionSide::Long, 100.0, 50.0)).should_exit);
        assert!(!pm.evaluate(&ctx(PositionSide::Short, 100.0, 150.0)).should_exit);
        assert!(pm.evaluate(&ctx(PositionSide::Long, 100.0, 104.01)).should_exit);
        assert!(pm.evaluate(&ctx(PositionSide::Short, 100.0, 95.99)).should_exit);
    }
}
