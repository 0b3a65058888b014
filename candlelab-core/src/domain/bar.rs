//! Bar: the fundamental market data unit, annotated with pattern scores.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// OHLCV bar at a single timestamp, plus the signed score of every detected
/// candlestick pattern on that bar.
///
/// Scores come from an external pattern detector: positive is bullish,
/// negative is bearish, zero (or absent) means the pattern did not fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub pattern_scores: BTreeMap<String, f64>,
}

impl Bar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// OHLC sanity: high bounds open/close from above, low from below, prices positive.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.low > 0.0
    }

    /// Score of `pattern` on this bar, 0.0 when absent.
    pub fn score(&self, pattern: &str) -> f64 {
        self.pattern_scores.get(pattern).copied().unwrap_or(0.0)
    }
}

/// Rejections raised while validating a bar table at the engine boundary.
#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar {index} ({timestamp}): OHLC values must be finite")]
    NonFinite {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error(
        "bar {index} ({timestamp}): inconsistent OHLC (open={open}, high={high}, low={low}, close={close})"
    )]
    Inconsistent {
        index: usize,
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("bar {index}: timestamp {timestamp} does not follow {previous}")]
    NonMonotonic {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Validated, chronologically ordered bar series.
///
/// The only way to build one is [`BarTable::new`], so any table handed to the
/// engine already satisfies the OHLC and strict-monotonicity invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTable {
    bars: Vec<Bar>,
}

impl BarTable {
    pub fn new(bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(BarError::NonFinite {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if !bar.is_sane() {
                return Err(BarError::Inconsistent {
                    index,
                    timestamp: bar.timestamp,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                });
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(BarError::NonMonotonic {
                        index,
                        timestamp: bar.timestamp,
                        previous,
                    });
                }
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn into_inner(self) -> Vec<Bar> {
        self.bars
    }
}

impl<'de> Deserialize<'de> for BarTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bars = Vec::<Bar>::deserialize(deserializer)?;
        BarTable::new(bars).map_err(serde::de::Error::custom)
    }
}
