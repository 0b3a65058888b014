//! Seeded synthetic bars for development runs.
//!
//! A daily random walk from 100.0 on weekdays, with each requested pattern
//! firing on a small fraction of bars. Results built on these bars are
//! tagged `has_synthetic` and should never be read as evidence.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use candlelab_core::domain::{Bar, BarError, BarTable};

/// Chance that a given pattern fires on a given bar.
const FIRE_PROBABILITY: f64 = 0.04;
const START_PRICE: f64 = 100.0;

fn start_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate `count` weekday bars. The same seed always yields the same table.
pub fn generate_synthetic_bars(
    seed: u64,
    count: usize,
    patterns: &[String],
) -> Result<BarTable, BarError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(count);
    let mut price = START_PRICE;
    let mut timestamp = start_timestamp();

    while bars.len() < count {
        if matches!(timestamp.weekday(), Weekday::Sat | Weekday::Sun) {
            timestamp += Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        let mut pattern_scores = BTreeMap::new();
        for pattern in patterns {
            let score = if rng.gen_bool(FIRE_PROBABILITY) {
                if rng.gen_bool(0.5) {
                    100.0
                } else {
                    -100.0
                }
            } else {
                0.0
            };
            pattern_scores.insert(pattern.clone(), score);
        }

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            pattern_scores,
        });

        price = close;
        timestamp += Duration::days(1);
    }

    BarTable::new(bars)
}
