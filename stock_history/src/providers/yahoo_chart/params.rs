use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::request_params::{BarsRequestParams, ProviderParams};

/// Yahoo-specific parameters for a chart request.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct YahooChartParams {
    /// Market region hint (e.g. "US").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Response language (e.g. "en-US").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Midnight UTC of `date` as a Unix timestamp.
fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

/// Builds the query string for `/v8/finance/chart/{symbol}`.
///
/// `period2` is the exclusive end bound.
pub fn construct_params(params: &BarsRequestParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("period1".to_string(), unix_midnight(params.start).to_string()),
        ("period2".to_string(), unix_midnight(params.end).to_string()),
        ("interval".to_string(), "1d".to_string()),
        ("events".to_string(), "history".to_string()),
        ("includeAdjustedClose".to_string(), "true".to_string()),
    ];
    if let ProviderParams::Yahoo(specific) = &params.provider_specific {
        if let Some(region) = &specific.region {
            query.push(("region".to_string(), region.clone()));
        }
        if let Some(lang) = &specific.lang {
            query.push(("lang".to_string(), lang.clone()));
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_are_utc_midnights() {
        let params = BarsRequestParams::new(
            "AAPL",
            NaiveDate::from_ymd_opt(2023, 1, 6).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 10).unwrap(),
        );
        let q = construct_params(&params);
        assert_eq!(q[0], ("period1".to_string(), "1672963200".to_string()));
        assert_eq!(q[1], ("period2".to_string(), "1673308800".to_string()));
        assert!(q.iter().all(|(k, _)| k != "region"));
    }

    #[test]
    fn region_and_lang_are_forwarded() {
        let mut params = BarsRequestParams::new(
            "AAPL",
            NaiveDate::from_ymd_opt(2023, 1, 6).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 10).unwrap(),
        );
        params.provider_specific = ProviderParams::Yahoo(YahooChartParams {
            region: Some("US".into()),
            lang: Some("en-US".into()),
        });
        let q = construct_params(&params);
        assert!(q.contains(&("region".to_string(), "US".to_string())));
        assert!(q.contains(&("lang".to_string(), "en-US".to_string())));
    }
}
