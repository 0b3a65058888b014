//! Entry rules: where a new position is filled, before slippage.
//!
//! Every rule is a pure function of the pattern bar's geometry and the next
//! bar's open. Missing or non-finite geometry falls back to the next open so
//! the simulation always progresses.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRule {
    /// Fill at the open of the bar after the pattern.
    #[default]
    OpenNextCandle,
    /// Fill at the midpoint of the pattern bar's range.
    MiddleOfPattern,
    /// Fill at the pattern bar's close.
    ClosePattern,
}

impl EntryRule {
    pub const ALL: [EntryRule; 3] = [
        EntryRule::OpenNextCandle,
        EntryRule::MiddleOfPattern,
        EntryRule::ClosePattern,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenNextCandle => "open_next_candle",
            Self::MiddleOfPattern => "middle_of_pattern",
            Self::ClosePattern => "close_pattern",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::OpenNextCandle => "Open price of next candle after pattern",
            Self::MiddleOfPattern => "Price at middle of pattern formation",
            Self::ClosePattern => "Closing price of pattern candle",
        }
    }

    /// Raw entry price for this rule.
    pub fn entry_price(self, pattern: &PatternGeometry, next_open: f64) -> f64 {
        let price = match self {
            Self::OpenNextCandle => None,
            Self::MiddleOfPattern => match (finite(pattern.high), finite(pattern.low)) {
                (Some(high), Some(low)) => Some((high + low) / 2.0),
                _ => None,
            },
            Self::ClosePattern => finite(pattern.close),
        };
        price.unwrap_or(next_open)
    }
}

impl fmt::Display for EntryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// High/low/close of the bar on which the pattern completed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PatternGeometry {
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl From<&Bar> for PatternGeometry {
    fn from(bar: &Bar) -> Self {
        Self {
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> PatternGeometry {
        PatternGeometry {
            high: Some(110.0),
            low: Some(100.0),
            close: Some(108.0),
        }
    }

    #[test]
    fn open_next_candle_uses_next_open() {
        assert_eq!(EntryRule::OpenNextCandle.entry_price(&geometry(), 107.5), 107.5);
    }

    #[test]
    fn middle_of_pattern_is_range_midpoint() {
        assert_eq!(EntryRule::MiddleOfPattern.entry_price(&geometry(), 107.5), 105.0);
    }

    #[test]
    fn close_pattern_uses_pattern_close() {
        assert_eq!(EntryRule::ClosePattern.entry_price(&geometry(), 107.5), 108.0);
    }

    #[test]
    fn missing_geometry_falls_back_to_next_open() {
        let empty = PatternGeometry::default();
        for rule in EntryRule::ALL {
            assert_eq!(rule.entry_price(&empty, 99.0), 99.0, "{rule}");
        }
    }

    #[test]
    fn half_missing_range_falls_back() {
        let g = PatternGeometry {
            high: Some(110.0),
            low: Some(f64::NAN),
            close: None,
        };
        assert_eq!(EntryRule::MiddleOfPattern.entry_price(&g, 99.0), 99.0);
        assert_eq!(EntryRule::ClosePattern.entry_price(&g, 99.0), 99.0);
    }

    #[test]
    fn serde_names_match_display() {
        for rule in EntryRule::ALL {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.name()));
        }
    }
}
