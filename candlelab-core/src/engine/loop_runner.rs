//! Bar-by-bar driver: the heart of the backtesting engine.
//!
//! One forward pass starting at bar 1. Per bar `i`:
//! 1. Signal: resolve bar `i-1`'s pattern scores
//! 2. Exit: advance the open position's extremes, ask the exit policy
//! 3. Entry: if flat and a pattern fired, open at the entry rule's price
//! 4. Post-bar: mark-to-market at bar `i`'s close, record an equity point
//!
//! Anything still open after the last bar is closed at the last close with
//! reason `end_of_data`.

use crate::components::{resolve_signal, ExitContext, ExitPolicy, PatternGeometry};
use crate::domain::{BarTable, TradeRecord, END_OF_DATA};
use crate::strategy::StrategyConfig;

use super::ledger::{EntryOutcome, Ledger};
use super::observer::{EngineObserver, NullObserver, TracingObserver};
use super::state::{EngineError, EquityPoint, RunResult};

/// Run a backtest with tracing output.
///
/// Validates `config`, then drives a fresh [`Backtester`] over `bars`.
pub fn run_backtest(bars: &BarTable, config: &StrategyConfig) -> Result<RunResult, EngineError> {
    Backtester::new(config.clone())?
        .with_observer(TracingObserver)
        .run(bars)
}

/// Owns one strategy's ledger and exit policy across runs.
pub struct Backtester {
    config: StrategyConfig,
    exit_policy: Box<dyn ExitPolicy>,
    ledger: Ledger,
    observer: Box<dyn EngineObserver>,
}

impl Backtester {
    /// Reject invalid configurations before any bar is seen.
    pub fn new(config: StrategyConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            exit_policy: config.exit_rule.build(),
            ledger: Ledger::new(&config),
            observer: Box::new(NullObserver),
            config,
        })
    }

    pub fn with_observer(mut self, observer: impl EngineObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Discard all account state from previous runs.
    pub fn reset(&mut self) {
        self.ledger.reset();
    }

    /// Run over `table`. Always starts from a reset ledger, so repeated runs
    /// over the same bars return identical results.
    pub fn run(&mut self, table: &BarTable) -> Result<RunResult, EngineError> {
        self.reset();
        let bars = table.bars();
        let initial_capital = self.ledger.initial_capital();
        self.observer
            .on_run_start(&self.config.name, bars.len(), initial_capital);

        if bars.len() < 2 {
            let result = RunResult::empty(initial_capital, bars.len());
            self.observer
                .on_run_complete(0, result.final_capital, result.max_drawdown_pct);
            return Ok(result);
        }

        let mut trades: Vec<TradeRecord> = Vec::new();
        let mut equity_curve = Vec::with_capacity(bars.len() - 1);
        let mut signal_count = 0;
        let mut skipped_entries = 0;

        for i in 1..bars.len() {
            let pattern_bar = &bars[i - 1];
            let bar = &bars[i];

            // ─── Signal ───
            let signal = resolve_signal(pattern_bar, &self.config.patterns);
            if signal.is_some() {
                signal_count += 1;
            }

            // ─── Exit ───
            let verdict = match self.ledger.position_mut() {
                Some(position) => {
                    position.observe_close(bar.close);
                    let ctx = ExitContext::new(position, bar, i, signal.as_ref());
                    Some(self.exit_policy.evaluate(&ctx))
                }
                None => None,
            };
            if let Some(verdict) = verdict.filter(|v| v.should_exit) {
                let trade = self.ledger.close_position(
                    verdict.price_or(bar.close),
                    i,
                    bar.timestamp,
                    &verdict.reason,
                    verdict.is_profit,
                )?;
                self.observer.on_exit(&trade);
                trades.push(trade);
            }

            // ─── Entry ───
            // A position closed above may be replaced on the same bar.
            if let (false, Some(signal)) = (self.ledger.has_position(), signal.as_ref()) {
                let geometry = PatternGeometry::from(pattern_bar);
                let price = self.config.entry_rule.entry_price(&geometry, bar.open);
                match self.ledger.open_position(
                    signal.direction,
                    price,
                    i,
                    bar.timestamp,
                    &signal.pattern,
                )? {
                    EntryOutcome::Opened => {
                        if let Some(position) = self.ledger.position() {
                            self.observer.on_entry(position, self.ledger.available());
                        }
                    }
                    EntryOutcome::Skipped(reason) => {
                        skipped_entries += 1;
                        self.observer.on_entry_skipped(i, &reason);
                    }
                }
            }

            // ─── Post-bar ───
            self.ledger.mark_to_market(bar.close);
            equity_curve.push(EquityPoint::from_ledger(&self.ledger, i, bar.timestamp));
        }

        // ─── End of data ───
        let last_index = bars.len() - 1;
        let last = &bars[last_index];
        if let Some(in_profit) = self.ledger.position().map(|p| p.pnl_at(last.close) > 0.0) {
            let trade = self.ledger.close_position(
                last.close,
                last_index,
                last.timestamp,
                END_OF_DATA,
                in_profit,
            )?;
            self.observer.on_exit(&trade);
            trades.push(trade);

            self.ledger.mark_to_market(last.close);
            if let Some(point) = equity_curve.last_mut() {
                *point = EquityPoint::from_ledger(&self.ledger, last_index, last.timestamp);
            }
        }

        let result = RunResult {
            trades,
            equity_curve,
            initial_capital,
            final_capital: self.ledger.available(),
            max_drawdown_pct: self.ledger.max_drawdown_pct(),
            bar_count: bars.len(),
            signal_count,
            skipped_entries,
        };
        self.observer.on_run_complete(
            result.trades.len(),
            result.final_capital,
            result.max_drawdown_pct,
        );
        Ok(result)
    }
}
