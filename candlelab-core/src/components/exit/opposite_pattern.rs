//! Pattern-driven exit.
//!
//! Fires on *any* watched pattern, whatever its direction. A bullish pattern
//! therefore also closes a long.

use super::{ExitContext, ExitPolicy, ExitSignal};

pub const OPPOSITE_PATTERN_REASON: &str = "opposite pattern detected";

#[derive(Debug, Clone, Copy, Default)]
pub struct OppositePattern;

impl ExitPolicy for OppositePattern {
    fn name(&self) -> &str {
        "opposite_pattern"
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitSignal {
        match ctx.signal {
            Some(_) => ExitSignal::exit(ctx.current_price, OPPOSITE_PATTERN_REASON, ctx.in_profit()),
            None => ExitSignal::hold(),
        }
    }
}
