//! Signal resolver: turns a bar's pattern scores into a trade direction.
//!
//! The strategy's pattern list is a priority list: the first pattern (in list
//! order) with a nonzero score decides the direction. Score magnitude never
//! breaks ties.

use crate::domain::{Bar, PositionSide};
use serde::{Deserialize, Serialize};

/// A fired pattern: which side it points to and which pattern fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSignal {
    pub direction: PositionSide,
    pub pattern: String,
}

/// Resolve the first firing pattern in `patterns` order.
///
/// Returns `None` when no listed pattern has a nonzero, finite score.
pub fn resolve_signal(bar: &Bar, patterns: &[String]) -> Option<PatternSignal> {
    patterns.iter().find_map(|pattern| {
        let score = bar.score(pattern);
        if !score.is_finite() || score == 0.0 {
            return None;
        }
        let direction = if score > 0.0 {
            PositionSide::Long
        } else {
            PositionSide::Short
        };
        Some(PatternSignal {
            direction,
            pattern: pattern.clone(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(pairs: &[(&str, f64)]) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1_000.0,
            pattern_scores: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bullish_score_is_long() {
        let s = bar(&[("HAMMER", 100.0)]);
        let sig = resolve_signal(&s, &list(&["HAMMER"])).unwrap();
        assert_eq!(sig.direction, PositionSide::Long);
        assert_eq!(sig.pattern, "HAMMER");
    }

    #[test]
    fn bearish_score_is_short() {
        let s = bar(&[("ENGULFING", -100.0)]);
        let sig = resolve_signal(&s, &list(&["ENGULFING"])).unwrap();
        assert_eq!(sig.direction, PositionSide::Short);
    }

    #[test]
    fn nothing_fires() {
        let s = bar(&[("HAMMER", 0.0), ("DOJI", 0.0)]);
        assert!(resolve_signal(&s, &list(&["HAMMER", "DOJI"])).is_none());
    }

    #[test]
    fn unlisted_patterns_are_ignored() {
        let s = bar(&[("DOJI", 100.0)]);
        assert!(resolve_signal(&s, &list(&["HAMMER"])).is_none());
    }

    #[test]
    fn list_order_wins_over_map_order_and_magnitude() {
        // BTreeMap iterates "AAA" first; the caller's list puts "ZZZ" first.
        let s = bar(&[("AAA", 200.0), ("ZZZ", -50.0)]);
        let sig = resolve_signal(&s, &list(&["ZZZ", "AAA"])).unwrap();
        assert_eq!(sig.pattern, "ZZZ");
        assert_eq!(sig.direction, PositionSide::Short);
    }

    #[test]
    fn zero_score_falls_through_to_next_pattern() {
        let s = bar(&[("HAMMER", 0.0), ("DOJI", 80.0)]);
        let sig = resolve_signal(&s, &list(&["HAMMER", "DOJI"])).unwrap();
        assert_eq!(sig.pattern, "DOJI");
    }

    #[test]
    fn nan_score_is_absent() {
        let s = bar(&[("HAMMER", f64::NAN), ("DOJI", -80.0)]);
        let sig = resolve_signal(&s, &list(&["HAMMER", "DOJI"])).unwrap();
        assert_eq!(sig.pattern, "DOJI");
    }
}
