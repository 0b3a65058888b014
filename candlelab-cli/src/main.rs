//! CandleLab CLI: run, validate, and inspect candlestick-pattern backtests.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `validate`: check a config file and list every problem found
//! - `rules`: list the available entry and exit rules
//! - `report`: print the Markdown report for a saved artifact directory
//!
//! Log level comes from `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use candlelab_core::components::{EntryRule, ExitRule};
use candlelab_core::strategy;
use candlelab_runner::export::{generate_report, load_artifacts, save_artifacts};
use candlelab_runner::{run_from_config, BacktestConfig, BacktestResult, ConfigError, DataOverride};

#[derive(Parser)]
#[command(
    name = "candlelab",
    about = "CandleLab CLI: candlestick pattern backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bars CSV. Overrides `data.bars_path` in the config.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Generate this many synthetic bars instead of reading a file.
        #[arg(long, conflicts_with = "bars")]
        synthetic: Option<usize>,

        /// Seed for synthetic bars.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Validate a TOML config file without running it.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// List entry and exit rules.
    Rules,
    /// Print the Markdown report for a saved run.
    Report {
        /// Artifact directory written by `run`.
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            synthetic,
            seed,
            output_dir,
        } => run_backtest_cmd(&config, bars, synthetic, seed, &output_dir),
        Commands::Validate { config } => run_validate(&config),
        Commands::Rules => {
            print_rules();
            Ok(())
        }
        Commands::Report { dir } => {
            let result = load_artifacts(&dir)?;
            print!("{}", generate_report(&result));
            Ok(())
        }
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    bars: Option<PathBuf>,
    synthetic: Option<usize>,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    let backtest_config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let data = DataOverride {
        bars_path: bars,
        synthetic_bars: synthetic,
        seed,
    };
    let result = run_from_config(&backtest_config, &data)?;

    print_summary(&result);

    // Full artifact set (manifest.json, metrics.json, trades.csv, equity.csv, report.md)
    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_validate(config_path: &Path) -> Result<()> {
    match BacktestConfig::from_file(config_path) {
        Ok(config) => {
            println!(
                "{}: ok ({} pattern(s), entry {}, exit {})",
                config_path.display(),
                config.strategy.patterns.len(),
                config.strategy.entry_rule.name(),
                config.strategy.exit_rule.name(),
            );
            Ok(())
        }
        Err(ConfigError::Invalid(strategy::ConfigError::Invalid { errors })) => {
            eprintln!("{}: {} problem(s)", config_path.display(), errors.len());
            for error in &errors {
                eprintln!("  - {error}");
            }
            std::process::exit(1);
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", config_path.display())),
    }
}

fn print_rules() {
    println!("Entry rules:");
    for rule in EntryRule::ALL {
        println!("  {:<24} {}", rule.name(), rule.description());
    }
    println!();
    println!("Exit rules (defaults shown):");
    for rule in ExitRule::defaults() {
        let params = serde_json::to_string(&rule).unwrap_or_default();
        println!("  {:<24} {}  {}", rule.name(), rule.description(), params);
    }
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", result.config.name);
    println!("Symbol:         {}", result.symbol);
    println!(
        "Period:         {} to {}",
        result.start_date, result.end_date
    );
    println!("Bars:           {}", result.bar_count);
    println!("Signals:        {}", result.signal_count);
    println!(
        "Trades:         {} ({} long, {} short)",
        m.total_trades, m.long_trades, m.short_trades
    );
    if result.skipped_entries > 0 {
        println!("Skipped:        {}", result.skipped_entries);
    }
    println!();
    println!("--- Performance ---");
    println!("Final Capital:  {:.2}", m.final_capital);
    println!("Total Return:   {:.2}%", m.total_return_pct);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown_pct);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {}", m.profit_factor);
    println!("Avg P&L:        {:.2}", m.avg_pnl);
    println!("Commission:     {:.2}", m.total_commission);
    println!("Max Consec Win: {}", m.max_consecutive_wins);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
    if !m.pattern_breakdown.is_empty() {
        println!();
        println!("--- Patterns ---");
        for (pattern, s) in &m.pattern_breakdown {
            println!(
                "{:<16} {:>4} trades  P&L {:>12.2}  win {:>5.1}%",
                pattern,
                s.count,
                s.total_pnl,
                s.win_rate * 100.0
            );
        }
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
