//! Export module
//!
//! Turns fetched price points into output records and writes one sorted
//! file per run, as CSV or Parquet.

mod csv;
mod parquet;

pub use self::csv::{read_csv, write_csv, CSV_HEADER};
pub use self::parquet::{output_schema, read_parquet, write_parquet};

use crate::clob::PricePoint;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Placeholder substituted into the filename pattern at export time
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("invalid {column} value: {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// One exported price sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// Market display name
    pub market: String,
    /// Price in [0, 1]
    pub price: Decimal,
}

impl OutputRecord {
    pub fn new(timestamp: DateTime<Utc>, market: impl Into<String>, price: Decimal) -> Self {
        Self {
            timestamp,
            market: market.into(),
            price,
        }
    }

    /// Build a record from a history point; `None` if price or time is unusable
    pub fn from_price_point(market: &str, point: &PricePoint) -> Option<Self> {
        Some(Self::new(point.timestamp()?, market, point.price()?))
    }

    /// Price expressed as a percentage
    pub fn probability(&self) -> Decimal {
        self.price * dec!(100)
    }
}

/// Sort by market name, then timestamp; ties keep their fetch order
pub fn sort_records(records: &mut [OutputRecord]) {
    records.sort_by(|a, b| {
        a.market
            .cmp(&b.market)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Writes a run's records to a timestamped file
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    filename_pattern: String,
    format: ExportFormat,
}

impl Exporter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        filename_pattern: impl Into<String>,
        format: ExportFormat,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename_pattern: filename_pattern.into(),
            format,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Output path for an export started at `at`.
    ///
    /// The format's extension is appended unless the pattern already ends
    /// with it.
    pub fn file_path(&self, at: DateTime<Utc>) -> PathBuf {
        let stamp = at.format("%Y%m%d_%H%M%S").to_string();
        let mut filename = self.filename_pattern.replace(TIMESTAMP_PLACEHOLDER, &stamp);

        let suffix = format!(".{}", self.format.extension());
        if !filename.to_ascii_lowercase().ends_with(&suffix) {
            filename.push_str(&suffix);
        }

        self.output_dir.join(filename)
    }

    /// Write `records` in their given order and return the file path
    pub fn write(&self, records: &[OutputRecord], at: DateTime<Utc>) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.file_path(at);

        match self.format {
            ExportFormat::Csv => write_csv(&path, records)?,
            ExportFormat::Parquet => write_parquet(&path, records)?,
        }

        tracing::info!(path = %path.display(), records = records.len(), format = %self.format, "Exported records");
        Ok(path)
    }
}
