use std::{collections::HashMap, num::NonZeroU32};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use governor::DefaultDirectRateLimiter;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use tracing::{debug, info, warn};

use crate::{
    models::{bar::Bar, bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, DataProvider, DecodeSnafu, ProviderError, ProviderInitError, ValidationSnafu,
        alpaca_rest::{
            params::{Adjustment, construct_params},
            response::{AlpacaBar, AlpacaResponse},
        },
        throttle,
    },
};

const BASE_URL: &str = "https://data.alpaca.markets/v2/stocks/bars";

pub struct AlpacaProvider {
    client: Client,
    limiter: DefaultDirectRateLimiter,
    _api_key: SecretString,
    _secret_key: SecretString,
}

impl AlpacaProvider {
    /// Creates a new Alpaca provider.
    ///
    /// Reads API keys from the `APCA_API_KEY_ID` and `APCA_API_SECRET_KEY`
    /// environment variables.
    pub fn new(requests_per_minute: NonZeroU32) -> Result<Self, ProviderInitError> {
        let api_key = SecretString::new(get_env_var("APCA_API_KEY_ID")?.into());
        let secret_key = SecretString::new(get_env_var("APCA_API_SECRET_KEY")?.into());

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(api_key.expose_secret())?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            header::HeaderValue::from_str(secret_key.expose_secret())?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            limiter: throttle::limiter(requests_per_minute),
            _api_key: api_key,
            _secret_key: secret_key,
        })
    }

    /// Follows `next_page_token` until every bar of one adjustment pass is collected.
    async fn fetch_pass(
        &self,
        params: &BarsRequestParams,
        adjustment: Adjustment,
    ) -> Result<Vec<AlpacaBar>, ProviderError> {
        let mut all_bars: Vec<AlpacaBar> = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let query_params = construct_params(params, adjustment, next_page_token.as_deref());

            self.limiter.until_ready().await;
            let response = self.client.get(BASE_URL).query(&query_params).send().await?;

            if !response.status().is_success() {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown API error".to_string());
                return ApiSnafu { message: error_msg }.fail();
            }

            let body = response.text().await?;
            let page: AlpacaResponse = serde_json::from_str(&body).context(DecodeSnafu)?;

            // Merge the bars from the current page into our collection.
            if let Some(mut bars) = page.bars {
                if let Some(symbol_bars) = bars.shift_remove(&params.symbol) {
                    all_bars.extend(symbol_bars);
                }
            }

            // If there's a next page token, use it for the next iteration. Otherwise, we're done.
            match page.next_page_token {
                Some(token) => {
                    debug!(symbol = %params.symbol, "following alpaca page token");
                    next_page_token = Some(token);
                }
                None => break,
            }
        }

        Ok(all_bars)
    }
}

/// Joins the raw and fully adjusted passes into canonical bars.
///
/// Bars are dated in New York time; anything dated at or after `end` is dropped.
pub(crate) fn merge_passes(
    symbol: &str,
    raw: Vec<AlpacaBar>,
    adjusted: Vec<AlpacaBar>,
    end: NaiveDate,
) -> BarSeries {
    let adjusted_close: HashMap<DateTime<Utc>, f64> =
        adjusted.into_iter().map(|b| (b.timestamp, b.close)).collect();

    let bars = raw
        .into_iter()
        .filter_map(|ab| {
            let date = ab.timestamp.with_timezone(&New_York).date_naive();
            if date >= end {
                return None;
            }
            let adj_close = adjusted_close.get(&ab.timestamp).copied().unwrap_or_else(|| {
                warn!(%symbol, %date, "no adjusted bar, using raw close");
                ab.close
            });
            Some(Bar {
                date,
                open: ab.open,
                high: ab.high,
                low: ab.low,
                close: ab.close,
                adj_close,
                volume: ab.volume.max(0.0).round() as u64,
                timestamp: ab.timestamp,
            })
        })
        .collect();

    BarSeries::new(symbol, bars)
}

#[async_trait]
impl DataProvider for AlpacaProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
        if params.start >= params.end {
            return ValidationSnafu {
                message: format!("empty range {}..{}", params.start, params.end),
            }
            .fail();
        }

        let raw = self.fetch_pass(&params, Adjustment::Raw).await?;
        if raw.is_empty() {
            info!(symbol = %params.symbol, "alpaca returned no bars");
            return Ok(BarSeries::empty(params.symbol));
        }
        let adjusted = self.fetch_pass(&params, Adjustment::All).await?;

        info!(symbol = %params.symbol, bars = raw.len(), "fetched alpaca bars");
        Ok(merge_passes(&params.symbol, raw, adjusted, params.end))
    }
}
