//! poly-history: batch exporter for historical Polymarket prices
//!
//! This library provides the core components for:
//! - Market discovery via the Gamma API
//! - Price history and order books from the CLOB API
//! - Request pacing and 429 backoff
//! - Idempotent runs through an append-only processed-marker file
//! - Sorted CSV/Parquet export
//! - Best bid/ask lookup for a single event

pub mod cli;
pub mod clob;
pub mod config;
pub mod export;
pub mod http;
pub mod market;
pub mod processor;
pub mod rate_limit;
pub mod telemetry;
pub mod tracker;
