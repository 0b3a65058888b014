//! Property tests for the metrics calculator.
//!
//! 1. Trade counts partition: wins + losses = total, long + short = total
//! 2. Win rate is a fraction and matches the win count
//! 3. Pattern breakdown counts sum to the trade count
//! 4. Max drawdown of a positive equity series stays within [0, 100]
//! 5. Profit factor classification follows gross profit and gross loss

use candlelab_core::domain::{PositionSide, TradeRecord};
use candlelab_runner::metrics::{max_drawdown_pct, profit_factor, MetricsBundle, ProfitFactor};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

const PATTERNS: [&str; 3] = ["CDLHAMMER", "CDLDOJI", "CDLENGULFING"];

fn trade(i: usize, pnl: f64, long: bool, pattern: usize) -> TradeRecord {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let entry_time = start + Duration::days(2 * i as i64);
    TradeRecord {
        side: if long {
            PositionSide::Long
        } else {
            PositionSide::Short
        },
        pattern: PATTERNS[pattern].to_string(),
        entry_bar: 2 * i + 1,
        entry_time,
        entry_price: 100.0,
        exit_bar: 2 * i + 2,
        exit_time: entry_time + Duration::days(1),
        exit_price: 100.0,
        exit_reason: "take profit reached".into(),
        quantity: 10.0,
        committed_capital: 1_000.0,
        pnl,
        pnl_pct: pnl / 10.0,
        entry_commission: 0.5,
        exit_commission: 0.5,
        net_pnl: pnl - 1.0,
        success: pnl > 0.0,
        exit_flagged_profit: pnl > 0.0,
        bars_held: 1,
    }
}

fn arb_trades() -> impl Strategy<Value = Vec<TradeRecord>> {
    prop::collection::vec((-500.0..500.0_f64, any::<bool>(), 0usize..3), 1..60).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (pnl, long, pattern))| trade(i, pnl, long, pattern))
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn counts_partition_and_rates_are_fractions(trades in arb_trades()) {
        let net: f64 = trades.iter().map(|t| t.net_pnl).sum();
        let m = MetricsBundle::compute(&trades, &[], 100_000.0, 100_000.0 + net);

        prop_assert_eq!(m.total_trades, trades.len());
        prop_assert_eq!(m.winning_trades + m.losing_trades, m.total_trades);
        prop_assert_eq!(m.long_trades + m.short_trades, m.total_trades);
        prop_assert!((0.0..=1.0).contains(&m.win_rate));
        prop_assert!(
            (m.win_rate - m.winning_trades as f64 / m.total_trades as f64).abs() < 1e-12
        );
        prop_assert!(m.max_consecutive_wins <= m.winning_trades);
        prop_assert!(m.max_consecutive_losses <= m.losing_trades);

        let breakdown_total: usize = m.pattern_breakdown.values().map(|s| s.count).sum();
        prop_assert_eq!(breakdown_total, m.total_trades);
    }

    #[test]
    fn drawdown_of_positive_series_is_bounded(
        equity in prop::collection::vec(1.0..1_000_000.0_f64, 1..200)
    ) {
        let dd = max_drawdown_pct(&equity);
        prop_assert!((0.0..100.0).contains(&dd), "drawdown {}", dd);
    }

    #[test]
    fn profit_factor_follows_gross_sums(trades in arb_trades()) {
        let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = trades.iter().filter(|t| t.pnl <= 0.0).map(|t| -t.pnl).sum();

        match profit_factor(&trades) {
            ProfitFactor::Finite(pf) => {
                prop_assert!(gross_loss > 0.0);
                prop_assert!((pf - gross_profit / gross_loss).abs() < 1e-9 * (1.0 + pf));
            }
            ProfitFactor::Infinite => {
                prop_assert!(gross_loss == 0.0 && gross_profit > 0.0);
            }
            ProfitFactor::Undefined => {
                prop_assert!(gross_loss == 0.0 && gross_profit == 0.0);
            }
        }
    }
}
