//! Bar loading for the runner.
//!
//! Bars come from a CSV file produced by an external pattern detector:
//! one row per bar, a timestamp column, OHLCV columns, and one column per
//! candlestick pattern holding that pattern's signed score. Column names
//! for the fixed fields are matched case-insensitively; every other column
//! is taken as a pattern score under its name as written.
//!
//! When no file is available, `--synthetic` substitutes a seeded random
//! walk (see [`crate::synthetic`]). Such results are tagged.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use candlelab_core::domain::{Bar, BarError, BarTable};

use crate::synthetic::generate_synthetic_bars;

const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "date", "datetime"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open bars file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: unparseable timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid bars: {0}")]
    Invalid(#[from] BarError),
}

/// Bars plus the provenance recorded alongside a run.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: BarTable,
    /// BLAKE3 over every timestamp, OHLCV value and pattern score.
    pub dataset_hash: String,
    /// True when the bars were generated rather than read.
    pub has_synthetic: bool,
}

impl LoadedData {
    /// Read bars from a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self, LoadError> {
        let bars = load_bars_csv(path)?;
        Ok(Self::real(bars))
    }

    /// Wrap an already-validated table.
    pub fn real(bars: BarTable) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            bars,
            dataset_hash,
            has_synthetic: false,
        }
    }

    /// Generate `count` synthetic bars scoring `patterns`.
    pub fn synthetic(seed: u64, count: usize, patterns: &[String]) -> Result<Self, LoadError> {
        let bars = generate_synthetic_bars(seed, count, patterns)?;
        let dataset_hash = dataset_hash(&bars);
        Ok(Self {
            bars,
            dataset_hash,
            has_synthetic: true,
        })
    }
}

/// Load and validate bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<BarTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_bars_csv(file)?;
    tracing::debug!(path = %path.display(), bars = table.len(), "loaded bars");
    Ok(table)
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    patterns: Vec<(usize, String)>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or(LoadError::MissingColumn("timestamp"))?;
        let open = find("open").ok_or(LoadError::MissingColumn("open"))?;
        let high = find("high").ok_or(LoadError::MissingColumn("high"))?;
        let low = find("low").ok_or(LoadError::MissingColumn("low"))?;
        let close = find("close").ok_or(LoadError::MissingColumn("close"))?;
        let volume = find("volume").ok_or(LoadError::MissingColumn("volume"))?;

        let fixed = [timestamp, open, high, low, close, volume];
        let patterns = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| {
                !fixed.contains(i)
                    && !TIMESTAMP_COLUMNS
                        .iter()
                        .any(|name| h.trim().eq_ignore_ascii_case(name))
            })
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            patterns,
        })
    }
}

/// Parse bars from any CSV reader. The first row must be a header.
pub fn parse_bars_csv<R: Read>(reader: R) -> Result<BarTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::from_headers(rdr.headers()?)?;
    let headers = rdr.headers()?.clone();

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize| -> Result<f64, LoadError> {
            let value = field(idx);
            value.parse::<f64>().map_err(|_| LoadError::BadNumber {
                row,
                column: headers.get(idx).unwrap_or("").to_string(),
                value: value.to_string(),
            })
        };

        let timestamp = parse_timestamp(field(columns.timestamp)).ok_or_else(|| {
            LoadError::BadTimestamp {
                row,
                value: field(columns.timestamp).to_string(),
            }
        })?;

        let mut pattern_scores = BTreeMap::new();
        for (idx, name) in &columns.patterns {
            let score = if field(*idx).is_empty() {
                0.0
            } else {
                number(*idx)?
            };
            pattern_scores.insert(name.clone(), score);
        }

        bars.push(Bar {
            timestamp,
            open: number(columns.open)?,
            high: number(columns.high)?,
            low: number(columns.low)?,
            close: number(columns.close)?,
            volume: number(columns.volume)?,
            pattern_scores,
        });
    }

    Ok(BarTable::new(bars)?)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Deterministic BLAKE3 hash over all bar data.
///
/// Pattern scores are hashed in key order, so the hash does not depend on
/// the CSV's column order.
pub fn dataset_hash(bars: &BarTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars.bars() {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
        for (pattern, score) in &bar.pattern_scores {
            hasher.update(pattern.as_bytes());
            hasher.update(&score.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
