use serde::{Deserialize, Serialize};

use crate::models::request_params::{BarsRequestParams, ProviderParams};

/// Specifies the corporate action adjustment for stock data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    Raw,
    Split,
    Dividend,
    All,
}

impl Adjustment {
    fn as_str(self) -> &'static str {
        match self {
            Adjustment::Raw => "raw",
            Adjustment::Split => "split",
            Adjustment::Dividend => "dividend",
            Adjustment::All => "all",
        }
    }
}

/// Specifies the source feed for stock data.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Sip,
    #[default]
    Iex,
    Otc,
}

impl Feed {
    fn as_str(self) -> &'static str {
        match self {
            Feed::Sip => "sip",
            Feed::Iex => "iex",
            Feed::Otc => "otc",
        }
    }
}

/// Alpaca-specific parameters for a bars request.
///
/// The adjustment is not configurable here: the provider always fetches a raw
/// pass for OHLC and an `all` pass for the adjusted close.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AlpacaBarsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<Feed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Page size (Alpaca caps this at 10000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Builds the query string for one page of `/v2/stocks/bars`.
pub fn construct_params(
    params: &BarsRequestParams,
    adjustment: Adjustment,
    page_token: Option<&str>,
) -> Vec<(String, String)> {
    let specific = match &params.provider_specific {
        ProviderParams::Alpaca(p) => p.clone(),
        _ => AlpacaBarsParams::default(),
    };

    let mut query = vec![
        ("symbols".to_string(), params.symbol.clone()),
        ("timeframe".to_string(), "1Day".to_string()),
        ("start".to_string(), params.start.format("%Y-%m-%d").to_string()),
        ("end".to_string(), params.end.format("%Y-%m-%d").to_string()),
        ("adjustment".to_string(), adjustment.as_str().to_string()),
        (
            "feed".to_string(),
            specific.feed.unwrap_or_default().as_str().to_string(),
        ),
        (
            "limit".to_string(),
            specific.limit.unwrap_or(10_000).min(10_000).to_string(),
        ),
        ("sort".to_string(), "asc".to_string()),
    ];
    if let Some(currency) = specific.currency {
        query.push(("currency".to_string(), currency));
    }
    if let Some(token) = page_token {
        query.push(("page_token".to_string(), token.to_string()));
    }
    query
}
