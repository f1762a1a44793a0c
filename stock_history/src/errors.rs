use chrono::NaiveDate;
use snafu::{Backtrace, Snafu};

use crate::providers::ProviderError;

/// The unified error type of [`HistoryLoader`](crate::loader::HistoryLoader).
///
/// None of these are swallowed inside the crate: a failed load never yields
/// a partial or empty series.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LoadError {
    /// The provider returned no bars for the requested symbol and range.
    #[snafu(display("no data for {symbol} between {start} and {end}"))]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// The requested range is reversed or lies outside the supported window.
    #[snafu(display("invalid range {start}..={end}: {reason}"))]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    /// The underlying provider failed (network, API or decoding error).
    #[snafu(display("provider failed while loading {symbol}: {source}"))]
    Provider {
        symbol: String,
        #[snafu(backtrace)]
        source: ProviderError,
    },

    /// The provider returned bars that break the series invariant.
    #[snafu(display("provider returned an inconsistent series for {symbol}: {message}"))]
    Inconsistent {
        symbol: String,
        message: String,
        backtrace: Backtrace,
    },
}

impl LoadError {
    /// `true` for [`LoadError::NoData`]; callers may retry with another range.
    pub fn is_no_data(&self) -> bool {
        matches!(self, LoadError::NoData { .. })
    }
}
