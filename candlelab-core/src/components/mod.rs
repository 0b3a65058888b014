//! Strategy components: the rule pieces the bar loop consults.
//!
//! - Signal resolver: first firing pattern in priority order
//! - Entry rules: where a new position fills
//! - Exit rules: when an open position closes

pub mod entry;
pub mod exit;
pub mod signal;

pub use entry::{EntryRule, PatternGeometry};
pub use exit::{ExitContext, ExitPolicy, ExitRule, ExitSignal};
pub use signal::{resolve_signal, PatternSignal};
