//! Strategy configuration: the immutable value every backtest runs against.
//!
//! - `StrategyConfig`: watched patterns, entry/exit rules, sizing and frictions.
//! - `ConfigHash`: structural identity (patterns + rule kinds, no parameter values).
//! - `full_hash()`: exact identity (every field).

use crate::components::{EntryRule, ExitRule};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_POSITION_SIZE_PCT: f64 = 10.0;
pub const DEFAULT_COMMISSION: f64 = 0.001;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

fn default_position_size_pct() -> f64 {
    DEFAULT_POSITION_SIZE_PCT
}

fn default_commission() -> f64 {
    DEFAULT_COMMISSION
}

fn default_initial_capital() -> f64 {
    DEFAULT_INITIAL_CAPITAL
}

/// Errors raised when a strategy configuration is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid strategy: {}", .errors.join("; "))]
    Invalid { errors: Vec<String> },
}

/// Bar interval the strategy is designed for. Descriptive only: the engine
/// never resamples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[default]
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1M")]
    Monthly,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Daily => "1d",
            Self::Weekly => "1w",
            Self::Monthly => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete strategy definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub name: String,
    /// Watched patterns in priority order.
    pub patterns: Vec<String>,
    #[serde(default)]
    pub entry_rule: EntryRule,
    #[serde(default)]
    pub exit_rule: ExitRule,
    /// Percent of available capital committed per trade, in (0, 100].
    #[serde(default = "default_position_size_pct")]
    pub position_size_pct: f64,
    /// Fraction of notional charged per side, in [0, 1).
    #[serde(default = "default_commission")]
    pub commission: f64,
    /// Fractional price penalty per side, in [0, 1).
    #[serde(default)]
    pub slippage: f64,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default)]
    pub timeframe: Timeframe,
}

impl StrategyConfig {
    /// A config with default sizing and frictions for the given patterns.
    pub fn new(name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            patterns,
            entry_rule: EntryRule::default(),
            exit_rule: ExitRule::default(),
            position_size_pct: DEFAULT_POSITION_SIZE_PCT,
            commission: DEFAULT_COMMISSION,
            slippage: 0.0,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            timeframe: Timeframe::default(),
        }
    }

    pub fn with_entry_rule(mut self, entry_rule: EntryRule) -> Self {
        self.entry_rule = entry_rule;
        self
    }

    pub fn with_exit_rule(mut self, exit_rule: ExitRule) -> Self {
        self.exit_rule = exit_rule;
        self
    }

    pub fn with_frictions(mut self, commission: f64, slippage: f64) -> Self {
        self.commission = commission;
        self.slippage = slippage;
        self
    }

    pub fn with_sizing(mut self, initial_capital: f64, position_size_pct: f64) -> Self {
        self.initial_capital = initial_capital;
        self.position_size_pct = position_size_pct;
        self
    }

    /// Every problem with this config, in a stable order. Empty when valid.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("strategy name is required".to_string());
        }
        if self.patterns.is_empty() {
            errors.push("at least one pattern must be selected".to_string());
        }
        if self.patterns.iter().any(|p| p.trim().is_empty()) {
            errors.push("pattern names must not be blank".to_string());
        }
        if !(self.position_size_pct > 0.0 && self.position_size_pct <= 100.0) {
            errors.push(format!(
                "position size must be in (0, 100] percent (got {})",
                self.position_size_pct
            ));
        }
        if !(0.0..1.0).contains(&self.commission) {
            errors.push(format!(
                "commission must be in [0, 1) (got {})",
                self.commission
            ));
        }
        if !(0.0..1.0).contains(&self.slippage) {
            errors.push(format!("slippage must be in [0, 1) (got {})", self.slippage));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            errors.push(format!(
                "initial capital must be positive (got {})",
                self.initial_capital
            ));
        }
        errors.extend(self.exit_rule.validation_errors());
        errors
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { errors })
        }
    }

    /// Structural hash: patterns and rule kinds, ignoring numeric parameters.
    ///
    /// Two stop-loss/take-profit strategies on the same patterns with
    /// different percentages share a `config_hash` but not a `full_hash`.
    pub fn config_hash(&self) -> ConfigHash {
        let structural = format!(
            "{}|{}|{}",
            self.patterns.join(","),
            self.entry_rule.name(),
            self.exit_rule.name(),
        );
        ConfigHash::from_bytes(structural.as_bytes())
    }

    /// Full hash over the canonical JSON form of every field.
    pub fn full_hash(&self) -> ConfigHash {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        ConfigHash::from_bytes(&canonical)
    }
}

/// BLAKE3 hex digest identifying a strategy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
