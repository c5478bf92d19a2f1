//! Parquet output

use super::{ExportError, OutputRecord};
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Exported record schema
pub fn output_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("market", DataType::Utf8, false),
        Field::new("price", DataType::Utf8, false), // String keeps Decimal precision
        Field::new("probability", DataType::Utf8, false),
    ])
}

/// Write records as a single row group batch
pub fn write_parquet(path: &Path, records: &[OutputRecord]) -> Result<(), ExportError> {
    let schema = Arc::new(output_schema());
    let file = File::create(path)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let timestamps: Vec<i64> = records
        .iter()
        .map(|r| r.timestamp.timestamp_micros())
        .collect();
    let markets: Vec<&str> = records.iter().map(|r| r.market.as_str()).collect();
    let prices: Vec<String> = records.iter().map(|r| r.price.to_string()).collect();
    let probabilities: Vec<String> = records
        .iter()
        .map(|r| r.probability().to_string())
        .collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")) as ArrayRef,
            Arc::new(StringArray::from(markets)) as ArrayRef,
            Arc::new(StringArray::from_iter_values(prices)) as ArrayRef,
            Arc::new(StringArray::from_iter_values(probabilities)) as ArrayRef,
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;

    tracing::debug!(path = %path.display(), count = records.len(), "Wrote Parquet");
    Ok(())
}

/// Read records back from an exported Parquet file
pub fn read_parquet(path: &Path) -> Result<Vec<OutputRecord>, ExportError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();

    for batch in reader {
        let batch = batch?;

        let timestamps = batch
            .column(0)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| invalid("timestamp", "column type"))?;
        let markets = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| invalid("market", "column type"))?;
        let prices = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| invalid("price", "column type"))?;

        for i in 0..batch.num_rows() {
            let micros = timestamps.value(i);
            let timestamp = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| invalid("timestamp", &micros.to_string()))?;
            let price = Decimal::from_str(prices.value(i))
                .map_err(|_| invalid("price", prices.value(i)))?;

            records.push(OutputRecord::new(timestamp, markets.value(i), price));
        }
    }

    Ok(records)
}

fn invalid(column: &'static str, value: &str) -> ExportError {
    ExportError::InvalidValue {
        column,
        value: value.to_string(),
    }
}
