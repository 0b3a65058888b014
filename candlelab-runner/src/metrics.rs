//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity series and/or trade list in,
//! scalar out. [`MetricsBundle::compute`] assembles them for one run.
//! Degenerate inputs produce sentinels (`0.0`, [`ProfitFactor::Infinite`],
//! [`ProfitFactor::Undefined`]), never errors.

use candlelab_core::domain::{PositionSide, TradeRecord};
use candlelab_core::engine::EquityPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Gross profit over gross loss, with its two degenerate cases named.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    /// Profits but no losses.
    Infinite,
    /// Neither profits nor losses.
    Undefined,
}

impl ProfitFactor {
    /// Numeric view: `inf` for [`ProfitFactor::Infinite`], `NaN` for
    /// [`ProfitFactor::Undefined`].
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Finite(v) => v,
            Self::Infinite => f64::INFINITY,
            Self::Undefined => f64::NAN,
        }
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{v:.2}"),
            Self::Infinite => write!(f, "inf"),
            Self::Undefined => write!(f, "n/a"),
        }
    }
}

/// Per-pattern trade statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub count: usize,
    pub total_pnl: f64,
    pub mean_pnl: f64,
    /// Fraction in [0, 1].
    pub win_rate: f64,
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBundle {
    // ── Capital ──
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return_pct: f64,

    // ── Trade counts ──
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    /// Fraction in [0, 1].
    pub win_rate: f64,

    // ── P&L ──
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub median_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: ProfitFactor,
    pub total_commission: f64,

    // ── Risk ──
    pub sharpe_ratio: f64,
    /// Positive percent, e.g. 12.5 for a 12.5% peak-to-trough loss.
    pub max_drawdown_pct: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // ── Duration ──
    pub avg_bars_held: f64,
    pub avg_trade_duration_secs: f64,

    pub pattern_breakdown: BTreeMap<String, PatternStats>,
}

impl MetricsBundle {
    /// The bundle for a run without trades.
    pub fn empty(initial_capital: f64, final_capital: f64) -> Self {
        Self {
            initial_capital,
            final_capital,
            total_return_pct: total_return_pct(initial_capital, final_capital),
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            long_trades: 0,
            short_trades: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            avg_pnl: 0.0,
            median_pnl: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            profit_factor: ProfitFactor::Undefined,
            total_commission: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            max_consecutive_wins: 0,
            max_consecutive_losses: 0,
            avg_bars_held: 0.0,
            avg_trade_duration_secs: 0.0,
            pattern_breakdown: BTreeMap::new(),
        }
    }

    /// Compute all metrics from a run's trades and equity curve.
    pub fn compute(
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        final_capital: f64,
    ) -> Self {
        if trades.is_empty() {
            return Self::empty(initial_capital, final_capital);
        }

        // Drawdown starts from initial capital like the ledger's peak; returns
        // come from the curve alone.
        let equity = equity_series(equity_curve, initial_capital);
        let curve: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades
            .iter()
            .filter(|t| !t.is_winner())
            .map(|t| t.pnl)
            .collect();

        Self {
            initial_capital,
            final_capital,
            total_return_pct: total_return_pct(initial_capital, final_capital),
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            long_trades: count_side(trades, PositionSide::Long),
            short_trades: count_side(trades, PositionSide::Short),
            win_rate: win_rate(trades),
            total_pnl: pnls.iter().sum(),
            avg_pnl: mean_f64(&pnls),
            median_pnl: median(&pnls),
            avg_win: mean_f64(&wins),
            avg_loss: mean_f64(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            profit_factor: profit_factor(trades),
            total_commission: trades.iter().map(|t| t.total_commission()).sum(),
            sharpe_ratio: sharpe_ratio(&curve),
            max_drawdown_pct: max_drawdown_pct(&equity),
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            avg_bars_held: mean_f64(
                &trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>(),
            ),
            avg_trade_duration_secs: mean_f64(
                &trades
                    .iter()
                    .map(|t| t.duration().num_seconds() as f64)
                    .collect::<Vec<_>>(),
            ),
            pattern_breakdown: pattern_breakdown(trades),
        }
    }

    /// Scalar metrics as a flat, ordered key-value map.
    ///
    /// Pattern statistics are flattened as `pattern.<name>.<stat>`.
    pub fn to_flat_map(&self) -> BTreeMap<String, f64> {
        let mut map: BTreeMap<String, f64> = [
            ("initial_capital", self.initial_capital),
            ("final_capital", self.final_capital),
            ("total_return_pct", self.total_return_pct),
            ("total_trades", self.total_trades as f64),
            ("winning_trades", self.winning_trades as f64),
            ("losing_trades", self.losing_trades as f64),
            ("long_trades", self.long_trades as f64),
            ("short_trades", self.short_trades as f64),
            ("win_rate", self.win_rate),
            ("total_pnl", self.total_pnl),
            ("avg_pnl", self.avg_pnl),
            ("median_pnl", self.median_pnl),
            ("avg_win", self.avg_win),
            ("avg_loss", self.avg_loss),
            ("largest_win", self.largest_win),
            ("largest_loss", self.largest_loss),
            ("profit_factor", self.profit_factor.as_f64()),
            ("total_commission", self.total_commission),
            ("sharpe_ratio", self.sharpe_ratio),
            ("max_drawdown_pct", self.max_drawdown_pct),
            ("max_consecutive_wins", self.max_consecutive_wins as f64),
            ("max_consecutive_losses", self.max_consecutive_losses as f64),
            ("avg_bars_held", self.avg_bars_held),
            ("avg_trade_duration_secs", self.avg_trade_duration_secs),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        for (pattern, stats) in &self.pattern_breakdown {
            map.insert(format!("pattern.{pattern}.count"), stats.count as f64);
            map.insert(format!("pattern.{pattern}.total_pnl"), stats.total_pnl);
            map.insert(format!("pattern.{pattern}.mean_pnl"), stats.mean_pnl);
            map.insert(format!("pattern.{pattern}.win_rate"), stats.win_rate);
        }
        map
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return in percent.
pub fn total_return_pct(initial_capital: f64, final_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_capital - initial_capital) / initial_capital * 100.0
}

/// Annualized Sharpe ratio from per-bar equity returns.
///
/// Sharpe = mean(returns) / sample_std(returns) * sqrt(252).
/// Returns 0.0 for fewer than 2 returns or zero variance.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    let returns = pct_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * (252.0_f64).sqrt()
}

/// Maximum peak-to-trough drawdown as a positive percentage.
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown_pct(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (peak - eq) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Win rate: fraction of trades that were winners.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses on realized P&L.
pub fn profit_factor(trades: &[TradeRecord]) -> ProfitFactor {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss > 0.0 {
        ProfitFactor::Finite(gross_profit / gross_loss)
    } else if gross_profit > 0.0 {
        ProfitFactor::Infinite
    } else {
        ProfitFactor::Undefined
    }
}

/// Maximum consecutive winning trades.
pub fn max_consecutive_wins(trades: &[TradeRecord]) -> usize {
    max_consecutive(trades, true)
}

/// Maximum consecutive losing trades.
pub fn max_consecutive_losses(trades: &[TradeRecord]) -> usize {
    max_consecutive(trades, false)
}

/// Count, P&L and win rate per originating pattern.
pub fn pattern_breakdown(trades: &[TradeRecord]) -> BTreeMap<String, PatternStats> {
    let mut grouped: BTreeMap<&str, Vec<&TradeRecord>> = BTreeMap::new();
    for trade in trades {
        grouped.entry(trade.pattern.as_str()).or_default().push(trade);
    }
    grouped
        .into_iter()
        .map(|(pattern, group)| {
            let count = group.len();
            let total_pnl: f64 = group.iter().map(|t| t.pnl).sum();
            let winners = group.iter().filter(|t| t.is_winner()).count();
            let stats = PatternStats {
                count,
                total_pnl,
                mean_pnl: total_pnl / count as f64,
                win_rate: winners as f64 / count as f64,
            };
            (pattern.to_string(), stats)
        })
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Initial capital followed by the equity at each processed bar.
pub fn equity_series(equity_curve: &[EquityPoint], initial_capital: f64) -> Vec<f64> {
    std::iter::once(initial_capital)
        .chain(equity_curve.iter().map(|p| p.equity))
        .collect()
}

/// Percent change between consecutive equity values, as fractions.
pub fn pct_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn count_side(trades: &[TradeRecord], side: PositionSide) -> usize {
    trades.iter().filter(|t| t.side == side).count()
}

fn max_consecutive(trades: &[TradeRecord], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            if current > max_streak {
                max_streak = current;
            }
        } else {
            current = 0;
        }
    }
    max_streak
}
