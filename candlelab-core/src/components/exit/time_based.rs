//! Time-based exit: close after N bars regardless of price.
//!
//! The signal always reports `is_profit = true`. The ledger's realized P&L
//! still decides whether the trade counts as a win.

use super::{ExitContext, ExitPolicy, ExitSignal};

#[derive(Debug, Clone)]
pub struct TimeBasedExit {
    pub max_bars: usize,
}

impl TimeBasedExit {
    pub fn new(max_bars: usize) -> Self {
        Self { max_bars }
    }
}

impl ExitPolicy for TimeBasedExit {
    fn name(&self) -> &str {
        "timebased_exit"
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        if ctx.bars_since_entry >= self.max_bars {
            ExitSignal::exit(
                ctx.current_price,
                format!("time exit after {} bars", ctx.bars_since_entry),
                true,
            )
        } else {
            ExitSignal::hold()
        }
    }
}
