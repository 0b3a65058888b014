//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning, plus a
//!   flat metrics map
//! - **CSV**: trade tape and equity curve for external analysis tools
//! - **Markdown**: a human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use candlelab_core::domain::TradeRecord;
use candlelab_core::engine::EquityPoint;

use crate::metrics::MetricsBundle;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Metrics as a flat JSON object. Non-finite values (an infinite or
/// undefined profit factor) become `null`.
pub fn export_metrics_json(metrics: &MetricsBundle) -> Result<String> {
    serde_json::to_string_pretty(&metrics.to_flat_map())
        .context("failed to serialize metrics to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: side, pattern, entry_bar, entry_time, entry_price, exit_bar,
/// exit_time, exit_price, exit_reason, quantity, committed_capital, pnl,
/// pnl_pct, entry_commission, exit_commission, net_pnl, success, bars_held
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "pattern",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "quantity",
        "committed_capital",
        "pnl",
        "pnl_pct",
        "entry_commission",
        "exit_commission",
        "net_pnl",
        "success",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.side.to_string(),
            &t.pattern,
            &t.entry_bar.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.exit_reason,
            &format!("{:.6}", t.quantity),
            &format!("{:.2}", t.committed_capital),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_pct),
            &format!("{:.2}", t.entry_commission),
            &format!("{:.2}", t.exit_commission),
            &format!("{:.2}", t.net_pnl),
            &t.success.to_string(),
            &t.bars_held.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV, one row per processed bar.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bar_index",
        "timestamp",
        "equity",
        "peak_equity",
        "drawdown_pct",
        "available_capital",
        "committed_capital",
    ])?;
    for p in equity_curve {
        wtr.write_record([
            &p.bar_index.to_string(),
            &p.timestamp.to_string(),
            &format!("{:.2}", p.equity),
            &format!("{:.2}", p.peak_equity),
            &format!("{:.4}", p.drawdown_pct),
            &format!("{:.2}", p.available_capital),
            &format!("{:.2}", p.committed_capital),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `metrics.json`: flat metrics map
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar equity curve
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("metrics.json", export_metrics_json(&result.metrics)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("equity.csv", export_equity_csv(&result.equity_curve)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let cfg = &result.config;

    md.push_str(&format!("# Backtest Report: {}\n\n", cfg.name));

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Timeframe | {} |\n", cfg.timeframe));
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!("| Signals | {} |\n", result.signal_count));
    md.push_str(&format!(
        "| Skipped Entries | {} |\n",
        result.skipped_entries
    ));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    // Strategy
    md.push_str("## Strategy\n\n");
    md.push_str("| Component | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Patterns | {} |\n", cfg.patterns.join(", ")));
    md.push_str(&format!(
        "| Entry | {} ({}) |\n",
        cfg.entry_rule.name(),
        cfg.entry_rule.description()
    ));
    md.push_str(&format!(
        "| Exit | {} ({}) |\n",
        cfg.exit_rule.name(),
        cfg.exit_rule.description()
    ));
    md.push_str(&format!(
        "| Position Size | {:.1}% |\n",
        cfg.position_size_pct
    ));
    md.push_str(&format!("| Commission | {:.3}% |\n", cfg.commission * 100.0));
    md.push_str(&format!("| Slippage | {:.3}% |\n", cfg.slippage * 100.0));
    md.push('\n');

    // Performance Summary
    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Initial Capital | ${:.0} |\n",
        m.initial_capital
    ));
    md.push_str(&format!("| Final Capital | ${:.2} |\n", m.final_capital));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return_pct));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown_pct));
    md.push_str(&format!(
        "| Trades | {} ({} long, {} short) |\n",
        m.total_trades, m.long_trades, m.short_trades
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {} |\n", m.profit_factor));
    md.push_str(&format!("| Avg P&L | {:.2} |\n", m.avg_pnl));
    md.push_str(&format!("| Largest Win | {:.2} |\n", m.largest_win));
    md.push_str(&format!("| Largest Loss | {:.2} |\n", m.largest_loss));
    md.push_str(&format!("| Commission Paid | {:.2} |\n", m.total_commission));
    md.push_str(&format!(
        "| Max Consecutive Wins | {} |\n",
        m.max_consecutive_wins
    ));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        m.max_consecutive_losses
    ));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    md.push('\n');

    // Pattern breakdown
    if !m.pattern_breakdown.is_empty() {
        md.push_str("## Patterns\n\n");
        md.push_str("| Pattern | Trades | Total P&L | Mean P&L | Win Rate |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: |\n");
        for (pattern, s) in &m.pattern_breakdown {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {:.2} | {:.1}% |\n",
                pattern,
                s.count,
                s.total_pnl,
                s.mean_pnl,
                s.win_rate * 100.0
            ));
        }
        md.push('\n');
    }

    md
}
