//! Percent trailing stop: exit on a retrace from the best close since entry.
//!
//! For longs: stop = highest_since_entry * (1 - trail).
//! For shorts: stop = lowest_since_entry * (1 + trail).
//!
//! The running extremes live on the position; the driver advances them with
//! the current close before evaluating.

use crate::domain::PositionSide;

use super::{ExitContext, ExitPolicy, ExitSignal};

pub const TRAILING_STOP_REASON: &str = "trailing stop triggered";

#[derive(Debug, Clone)]
pub struct TrailingStop {
    /// Trail distance as a fraction (e.g., 0.02 for 2%).
    pub trail: f64,
}

impl TrailingStop {
    pub fn new(trailing_stop_pct: f64) -> Self {
        Self {
            trail: trailing_stop_pct / 100.0,
        }
    }

    /// Stop level implied by the current extremes.
    pub fn stop_price(&self, ctx: &ExitContext<'_>) -> f64 {
        match ctx.side {
            PositionSide::Long => ctx.highest_since_entry * (1.0 - self.trail),
            PositionSide::Short => ctx.lowest_since_entry * (1.0 + self.trail),
        }
    }
}

impl ExitPolicy for TrailingStop {
    fn name(&self) -> &str {
        "trailing_stop"
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        let stop = self.stop_price(ctx);
        let hit = match ctx.side {
            PositionSide::Long => ctx.current_price <= stop,
            PositionSide::Short => ctx.current_price >= stop,
        };
        if hit {
            ExitSignal::exit(ctx.current_price, TRAILING_STOP_REASON, ctx.in_profit())
        } else {
            ExitSignal::hold()
        }
    }
}
