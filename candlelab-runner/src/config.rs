//! TOML backtest configuration.
//!
//! ```toml
//! [strategy]
//! name = "hammer_reversal"
//! patterns = ["CDLHAMMER", "CDLENGULFING"]
//! entry_rule = "open_next_candle"
//! commission = 0.001
//!
//! [strategy.exit_rule]
//! type = "stop_loss_take_profit"
//! stop_loss_pct = 2.0
//! take_profit_pct = 4.0
//!
//! [data]
//! bars_path = "bars/SPY.csv"
//! symbol = "SPY"
//! ```
//!
//! Omitted strategy fields take their defaults. The parsed strategy is
//! validated before it is returned.

use std::path::{Path, PathBuf};

use candlelab_core::strategy::{self, StrategyConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] strategy::ConfigError),
}

/// Where the bars come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with OHLCV and pattern-score columns.
    #[serde(default)]
    pub bars_path: Option<PathBuf>,
    /// Label recorded in results and artifact directory names.
    #[serde(default)]
    pub symbol: Option<String>,
}

/// A strategy plus its data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.strategy.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file. A relative `bars_path` is
    /// resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&toml_str)?;
        if let (Some(bars_path), Some(base)) = (config.data.bars_path.as_mut(), path.parent()) {
            if bars_path.is_relative() {
                *bars_path = base.join(&*bars_path);
            }
        }
        Ok(config)
    }

    /// Symbol label, falling back to the strategy name.
    pub fn symbol(&self) -> &str {
        self.data.symbol.as_deref().unwrap_or(&self.strategy.name)
    }
}
