//! Run counters
//!
//! Emitted through the `metrics` facade. Without an installed recorder the
//! calls are no-ops.

use metrics::{counter, describe_counter, Unit};

/// Counters reported by an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCounter {
    /// Markets returned by discovery
    MarketsDiscovered,
    /// Instruments fetched successfully
    MarketsProcessed,
    /// Instruments skipped because they were already processed
    MarketsSkipped,
    /// Instruments whose fetch failed
    FetchErrors,
    /// Records written to the export file
    RecordsWritten,
}

impl RunCounter {
    /// Metric name
    pub fn name(&self) -> &'static str {
        match self {
            RunCounter::MarketsDiscovered => "poly_history_markets_discovered_total",
            RunCounter::MarketsProcessed => "poly_history_markets_processed_total",
            RunCounter::MarketsSkipped => "poly_history_markets_skipped_total",
            RunCounter::FetchErrors => "poly_history_fetch_errors_total",
            RunCounter::RecordsWritten => "poly_history_records_written_total",
        }
    }

    const ALL: [RunCounter; 5] = [
        RunCounter::MarketsDiscovered,
        RunCounter::MarketsProcessed,
        RunCounter::MarketsSkipped,
        RunCounter::FetchErrors,
        RunCounter::RecordsWritten,
    ];
}

/// Register counter descriptions with the active recorder
pub fn describe_counters() {
    for metric in RunCounter::ALL {
        describe_counter!(metric.name(), Unit::Count, metric.name());
    }
}

/// Add `value` to a run counter
pub fn increment_counter(metric: RunCounter, value: u64) {
    counter!(metric.name()).increment(value);
}
