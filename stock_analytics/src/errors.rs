//! Error types of the analytics layer.
use std::path::PathBuf;

use chrono::NaiveDate;
use stock_history::{LoadError, providers::ProviderInitError};

#[derive(thiserror::Error, Debug, PartialEq)]
/// Failures while deriving metrics from a bar series.
pub enum ComputationError {
    #[error("cannot enrich an empty series for {symbol}")]
    /// The series has no bars.
    EmptySeries {
        /// Symbol of the empty series.
        symbol: String,
    },
    #[error("close before {date} is {close}, cannot compute a return")]
    /// The previous close is zero or not finite.
    InvalidClose {
        /// Date of the bar whose return could not be computed.
        date: NaiveDate,
        /// The offending previous close.
        close: f64,
    },
    #[error("{field} is not finite on {date}")]
    /// A derived value came out as NaN or infinite.
    NonFinite {
        /// Date of the row.
        date: NaiveDate,
        /// Name of the derived column.
        field: &'static str,
    },
}

#[derive(thiserror::Error, Debug, PartialEq)]
/// Failures while assembling a prediction feature vector.
pub enum FeatureError {
    #[error("{field} sentiment count {value} is outside 0..={max}")]
    /// A sentiment count is negative or above the accepted maximum.
    SentimentOutOfRange {
        /// `pos`, `neg` or `neutral`.
        field: &'static str,
        /// The rejected value.
        value: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    #[error("no bars to build features from for {symbol}")]
    /// The enriched series is empty.
    EmptySeries {
        /// Symbol of the empty series.
        symbol: String,
    },
}

#[derive(thiserror::Error, Debug)]
/// Failures while loading or evaluating the price model.
pub enum PredictionError {
    #[error("cannot read model {path}: {source}")]
    /// The model file could not be opened or read.
    Io {
        /// Model location.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    #[error("cannot decode model {path}: {source}")]
    /// The model file is not a serialized linear regression.
    Decode {
        /// Model location.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    #[error("model evaluation failed: {0}")]
    /// The model rejected the input.
    Model(String),
    #[error("model returned no value")]
    /// The model produced an empty output.
    EmptyOutput,
    #[error("model returned a non-finite value: {0}")]
    /// The model produced NaN or infinity.
    NonFinite(f64),
}

#[derive(thiserror::Error, Debug)]
/// Failures while reading the forecast table.
pub enum ForecastError {
    #[error("cannot read forecast table {path}: {source}")]
    /// The CSV could not be opened or parsed.
    Csv {
        /// Table location.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
    #[error("row {row}: unrecognized date {value:?}")]
    /// A `date` cell is neither `YYYY-MM-DD` nor `YYYY-MM-DD HH:MM:SS`.
    Date {
        /// 1-based data row.
        row: usize,
        /// The raw cell.
        value: String,
    },
}

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by the dashboard session.
pub enum DashboardError {
    #[error("symbol {symbol} is not offered by this dashboard")]
    /// The symbol is not in the configured list.
    UnknownSymbol {
        /// The rejected symbol.
        symbol: String,
    },
    #[error("range {start}..={end} is not selectable: {reason}")]
    /// A range outside the selectable window.
    Range {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
        /// What bound was violated.
        reason: String,
    },
    #[error("no prediction model configured")]
    /// `predict` was called without a model.
    NoPredictor,
    #[error(transparent)]
    /// Loading history failed.
    Load(#[from] LoadError),
    #[error(transparent)]
    /// Enrichment failed.
    Computation(#[from] ComputationError),
    #[error(transparent)]
    /// Building features failed.
    Feature(#[from] FeatureError),
    #[error(transparent)]
    /// The model failed.
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    /// The configured provider could not be built.
    ProviderInit(#[from] ProviderInitError),
}
