//! Canonical in-memory representation of a daily price bar (OHLCV).
//!
//! This struct is the standard output of every [`DataProvider`](crate::providers::DataProvider)
//! implementation, whatever the vendor's own column naming is.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single trading day (OHLCV plus adjusted close).
///
/// Field order matches the canonical column order, see [`Bar::COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date in the exchange's time zone.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price of the session.
    pub high: f64,

    /// Lowest price of the session.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Close adjusted for splits and dividends.
    pub adj_close: f64,

    /// Shares traded during the session.
    pub volume: u64,

    /// The instant the provider stamped this bar with (UTC).
    #[serde(rename = "datetime")]
    pub timestamp: DateTime<Utc>,
}

impl Bar {
    /// Canonical column names, in order.
    pub const COLUMNS: [&'static str; 8] = [
        "date",
        "open",
        "high",
        "low",
        "close",
        "adj_close",
        "volume",
        "datetime",
    ];
}
