//! Error types for rate resolution and storage

use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by a `RateStore` implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with the same unique key is already stored.
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Failed to decode stored record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Errors surfaced by the rate resolver, backfill importer and report.
#[derive(Error, Debug)]
pub enum RateError {
    #[error("Rate already exists for {source_name} on {date}")]
    RateExists {
        source_name: String,
        date: NaiveDate,
    },

    #[error("{source_name} only provides the current rate, cannot fetch {date}")]
    UnsupportedDate {
        source_name: String,
        date: NaiveDate,
    },

    #[error("No rates found for source {0}")]
    NoRatesFound(String),

    #[error("No provider configured for source {0}")]
    UnknownSource(String),

    #[error("Invalid rate {value} returned by {source_name} for {date}")]
    InvalidRate {
        source_name: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("Invalid window: start offset {start} is after end offset {end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Opaque provider failure, passed through verbatim.
    #[error(transparent)]
    Provider(anyhow::Error),
}

/// Result type alias for rate operations
pub type Result<T> = std::result::Result<T, RateError>;
