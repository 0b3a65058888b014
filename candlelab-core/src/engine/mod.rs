//! Backtesting engine: bar-by-bar driver and the ledger it mutates.
//!
//! The driver walks a validated [`BarTable`](crate::domain::BarTable) once:
//! resolve the previous bar's pattern, evaluate the exit rule, enter if flat,
//! then mark-to-market. All capital movement goes through the [`Ledger`];
//! all logging goes through an injected [`EngineObserver`].

pub mod ledger;
pub mod loop_runner;
pub mod observer;
pub mod state;

pub use ledger::{EntryOutcome, Ledger, LedgerError, SkipReason};
pub use loop_runner::{run_backtest, Backtester};
pub use observer::{EngineObserver, NullObserver, TracingObserver};
pub use state::{EngineError, EquityPoint, RunResult};
