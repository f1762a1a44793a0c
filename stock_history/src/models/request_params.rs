use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::providers::{alpaca_rest::params::AlpacaBarsParams, yahoo_chart::params::YahooChartParams};

/// Vendor-agnostic parameters for a daily bars request.
///
/// This is the standard input of every
/// [`DataProvider`](crate::providers::DataProvider). The loader fills it in
/// after snapping the caller's range onto business days.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BarsRequestParams {
    /// Ticker to request (e.g. `"AAPL"`).
    pub symbol: String,

    /// First trading date wanted (inclusive).
    pub start: NaiveDate,

    /// Upper bound (exclusive).
    ///
    /// Providers should return bars strictly before this date. The loader
    /// passes the caller's inclusive end plus one day.
    pub end: NaiveDate,

    /// Optional, provider-specific parameters.
    #[serde(default)]
    pub provider_specific: ProviderParams,
}

impl BarsRequestParams {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            provider_specific: ProviderParams::None,
        }
    }
}

/// Per-request options for one particular provider.
///
/// Keeps vendor knobs out of the universal [`BarsRequestParams`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum ProviderParams {
    #[default]
    None,
    Alpaca(AlpacaBarsParams),
    Yahoo(YahooChartParams),
}
