//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, the unified interface for
//! fetching daily bars from a market data vendor (Yahoo Finance, Alpaca).
//! Vendor quirks such as column naming, time zones, pagination and the
//! exclusive end bound are absorbed inside each implementation.
//!
//! The trait is async and object safe, so the loader can hold a
//! `dyn DataProvider` picked at runtime through [`build_provider`].
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use stock_history::models::{bar_series::BarSeries, request_params::BarsRequestParams};
//! use stock_history::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl DataProvider for MyProvider {
//!     async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
//!         Ok(BarSeries::empty(params.symbol))
//!     }
//! }
//! ```

pub mod alpaca_rest;
pub mod throttle;
pub mod yahoo_chart;

use std::{fmt, num::NonZeroU32, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{alpaca_rest::provider::AlpacaProvider, yahoo_chart::provider::YahooChartProvider},
};

/// Trait for fetching daily bars from a market data provider.
#[async_trait]
pub trait DataProvider {
    /// Fetches daily bars for `params.symbol` in `[params.start, params.end)`.
    ///
    /// # Returns
    ///
    /// * `Ok(BarSeries)` - The bars found. An empty series means the vendor
    ///   had nothing for this symbol and range.
    /// * `Err(ProviderError)` - Transport, API or decoding failures.
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"), context(false))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"), context(false))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider endpoint is not a valid URL.
    #[snafu(display("Invalid base URL: {message}"))]
    BaseUrl {
        message: String,
        backtrace: Backtrace,
    },

    /// API key contains invalid characters.
    #[snafu(display("Invalid API key format: {source}"), context(false))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"), context(false))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message (e.g., invalid API key).
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded.
    #[snafu(display("Malformed provider response: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },
}

/// Which upstream to use (serde snake_case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Yahoo Finance chart API (no credentials).
    #[default]
    Yahoo,
    /// Alpaca market data API.
    Alpaca,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Yahoo => f.write_str("yahoo"),
            ProviderId::Alpaca => f.write_str("alpaca"),
        }
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderId::Yahoo),
            "alpaca" => Ok(ProviderId::Alpaca),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Build a boxed data provider for the supplied [`ProviderId`].
///
/// `requests_per_minute` caps outgoing HTTP calls.
pub fn build_provider(
    id: ProviderId,
    requests_per_minute: NonZeroU32,
) -> Result<Box<dyn DataProvider + Send + Sync>, ProviderInitError> {
    match id {
        ProviderId::Yahoo => Ok(Box::new(YahooChartProvider::new(requests_per_minute)?)),
        ProviderId::Alpaca => Ok(Box::new(AlpacaProvider::new(requests_per_minute)?)),
    }
}
