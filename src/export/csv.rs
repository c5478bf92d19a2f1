//! CSV output

use super::{ExportError, OutputRecord};
use chrono::NaiveDateTime;
use csv::{Reader, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

/// Column order of exported CSV files
pub const CSV_HEADER: [&str; 4] = ["timestamp", "market", "price", "probability"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    market: &'a str,
    price: String,
    probability: String,
}

impl<'a> From<&'a OutputRecord> for CsvRow<'a> {
    fn from(record: &'a OutputRecord) -> Self {
        Self {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            market: &record.market,
            price: record.price.to_string(),
            probability: record.probability().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvInput {
    timestamp: String,
    market: String,
    price: String,
}

/// Write records with a header row
pub fn write_csv(path: &Path, records: &[OutputRecord]) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = Writer::from_writer(BufWriter::new(file));

    // serialize() only emits headers alongside the first row
    if records.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), count = records.len(), "Wrote CSV");
    Ok(())
}

/// Read records back from an exported CSV file
pub fn read_csv(path: &Path) -> Result<Vec<OutputRecord>, ExportError> {
    let mut reader = Reader::from_path(path)?;
    let mut records = Vec::new();

    for row in reader.deserialize::<CsvInput>() {
        let row = row?;
        let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| ExportError::InvalidValue {
                column: "timestamp",
                value: row.timestamp.clone(),
            })?
            .and_utc();
        let price = Decimal::from_str(&row.price).map_err(|_| ExportError::InvalidValue {
            column: "price",
            value: row.price.clone(),
        })?;

        records.push(OutputRecord::new(timestamp, row.market, price));
    }

    Ok(records)
}
