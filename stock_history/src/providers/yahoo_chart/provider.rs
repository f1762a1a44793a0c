use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::{America::New_York, Tz};
use governor::DefaultDirectRateLimiter;
use reqwest::{Client, Url, header};
use snafu::ResultExt;
use tracing::{info, warn};

use crate::{
    models::{bar::Bar, bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, BaseUrlSnafu, DataProvider, DecodeSnafu, InternalSnafu, ProviderError,
        ProviderInitError, ValidationSnafu, throttle,
        yahoo_chart::{
            params::construct_params,
            response::{ChartEnvelope, ChartResult},
        },
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// Yahoo answers this code for unknown symbols and ranges without data.
const NOT_FOUND: &str = "Not Found";

pub struct YahooChartProvider {
    client: Client,
    limiter: DefaultDirectRateLimiter,
    base_url: Url,
}

impl YahooChartProvider {
    /// Creates a new Yahoo chart provider. No credentials are needed.
    pub fn new(requests_per_minute: NonZeroU32) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        // The chart endpoint rejects requests without a browser-like agent.
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("Mozilla/5.0 (compatible; stock_history/0.1)"),
        );
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            limiter: throttle::limiter(requests_per_minute),
            base_url: Url::parse(BASE_URL).map_err(|e| {
                BaseUrlSnafu {
                    message: e.to_string(),
                }
                .build()
            })?,
        })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                InternalSnafu {
                    message: "chart base url cannot carry a path",
                }
                .build()
            })?
            .pop_if_empty()
            .push(symbol);
        Ok(url)
    }
}

/// Converts one chart result into canonical bars dated in the exchange's time zone.
///
/// Rows with a missing price or volume are skipped; rows dated outside
/// `[start, end)` are dropped.
pub(crate) fn to_series(
    symbol: &str,
    result: ChartResult,
    start: NaiveDate,
    end: NaiveDate,
) -> BarSeries {
    let tz: Tz = result
        .meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or(New_York);

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .unwrap_or_default()
        .adjclose;

    let mut skipped = 0usize;
    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let at = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
        let row = (
            DateTime::from_timestamp(ts, 0),
            at(&quote.open),
            at(&quote.high),
            at(&quote.low),
            at(&quote.close),
            quote.volume.get(i).copied().flatten(),
        );
        let (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) = row
        else {
            skipped += 1;
            continue;
        };

        let date = timestamp.with_timezone(&tz).date_naive();
        if date < start || date >= end {
            continue;
        }
        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            adj_close: at(&adjclose).unwrap_or(close),
            volume,
            timestamp,
        });
    }
    if skipped > 0 {
        warn!(%symbol, skipped, "skipped incomplete yahoo rows");
    }

    BarSeries::new(symbol, bars)
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
        if params.start >= params.end {
            return ValidationSnafu {
                message: format!("empty range {}..{}", params.start, params.end),
            }
            .fail();
        }

        let url = self.chart_url(&params.symbol)?;
        self.limiter.until_ready().await;
        let response = self
            .client
            .get(url)
            .query(&construct_params(&params))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: ChartEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return ApiSnafu {
                    message: format!("HTTP {status}: {body}"),
                }
                .fail();
            }
            Err(e) => return Err(e).context(DecodeSnafu),
        };

        if let Some(err) = envelope.chart.error {
            if err.code == NOT_FOUND {
                info!(symbol = %params.symbol, description = %err.description, "yahoo has no data");
                return Ok(BarSeries::empty(params.symbol));
            }
            return ApiSnafu {
                message: format!("{}: {}", err.code, err.description),
            }
            .fail();
        }

        let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(BarSeries::empty(params.symbol));
        };
        let series = to_series(&params.symbol, result, params.start, params.end);
        info!(symbol = %params.symbol, bars = series.len(), "fetched yahoo bars");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2023-01-05 .. 2023-01-09 AAPL, with one halted (null) row
    const BODY: &str = r#"{"chart":{"result":[{
        "meta":{"currency":"USD","symbol":"AAPL","exchangeTimezoneName":"America/New_York"},
        "timestamp":[1672929000,1673015400,1673274600,1673361000],
        "indicators":{
            "quote":[{
                "open":[127.13,126.01,130.47,null],
                "high":[127.77,130.29,133.41,null],
                "low":[124.76,124.89,129.89,null],
                "close":[125.02,129.62,130.15,null],
                "volume":[80962700,87754700,70790800,null]
            }],
            "adjclose":[{"adjclose":[123.9,128.4,128.9,null]}]
        }}],"error":null}}"#;

    fn parse(body: &str) -> ChartEnvelope {
        serde_json::from_str(body).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn converts_columns_into_rows() {
        let result = parse(BODY).chart.result.unwrap().remove(0);
        let series = to_series("AAPL", result, d(2023, 1, 5), d(2023, 1, 11));

        assert_eq!(series.len(), 3);
        let dates: Vec<NaiveDate> = series.bars.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2023, 1, 5), d(2023, 1, 6), d(2023, 1, 9)]);

        let first = series.first().unwrap();
        assert_eq!(first.open, 127.13);
        assert_eq!(first.close, 125.02);
        assert_eq!(first.adj_close, 123.9);
        assert_eq!(first.volume, 80_962_700);
    }

    #[test]
    fn end_bound_is_exclusive() {
        let result = parse(BODY).chart.result.unwrap().remove(0);
        let series = to_series("AAPL", result, d(2023, 1, 5), d(2023, 1, 9));
        assert_eq!(series.last().unwrap().date, d(2023, 1, 6));
    }

    #[test]
    fn not_found_envelope_decodes() {
        let env = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        );
        assert!(env.chart.result.is_none());
        assert_eq!(env.chart.error.unwrap().code, NOT_FOUND);
    }

    #[test]
    fn empty_range_result_has_no_rows() {
        let env = parse(
            r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"},"indicators":{"quote":[{}],"adjclose":[{}]}}],"error":null}}"#,
        );
        let result = env.chart.result.unwrap().remove(0);
        assert!(to_series("AAPL", result, d(2023, 1, 7), d(2023, 1, 8)).is_empty());
    }

    #[test]
    fn chart_url_escapes_symbol() {
        let provider = YahooChartProvider::new(throttle::DEFAULT_REQUESTS_PER_MINUTE).unwrap();
        let url = provider.chart_url("BRK/B").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/BRK%2FB"
        );
    }
}
