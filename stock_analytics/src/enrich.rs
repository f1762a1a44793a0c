//! Derived metrics over a daily bar series.
//!
//! [`enrich`] computes, in order:
//! 1. the simple return `close[i] / close[i-1] - 1`,
//! 2. the log return `ln(close[i] / close[i-1])` (both 0 on the first bar),
//! 3. the daily volatility: one sample standard deviation over the whole
//!    log-return column, leading 0 included, written to every row,
//! 4. the annualized volatility `daily * sqrt(252) * 100`,
//! 5. trailing 50- and 200-bar means of the close with a minimum window of 1.
//!
//! Volatility is a window statistic, not a rolling one: changing the range
//! changes it for every row.

use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use stock_history::models::{bar::Bar, bar_series::BarSeries};
use tracing::debug;

use crate::errors::ComputationError;

/// Trading days used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Window of the short moving average.
pub const SHORT_MA_WINDOW: usize = 50;
/// Window of the long moving average.
pub const LONG_MA_WINDOW: usize = 200;

/// A bar plus the metrics derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedBar {
    /// The source bar.
    #[serde(flatten)]
    pub bar: Bar,
    /// Fractional change of the close against the previous bar.
    pub simple_return: f64,
    /// Natural log of the close ratio against the previous bar.
    pub log_return: f64,
    /// Sample standard deviation of the window's log returns.
    pub daily_volatility: f64,
    /// `daily_volatility * sqrt(252) * 100`.
    pub annualized_volatility: f64,
    /// Mean close over the last 50 bars (fewer at the start).
    pub ma50: f64,
    /// Mean close over the last 200 bars (fewer at the start).
    pub ma200: f64,
}

impl EnrichedBar {
    /// Date of the underlying bar.
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }
}

/// An enriched window for one symbol. Rebuilt, never patched, when the range changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    /// Symbol of the series.
    pub symbol: String,
    /// Rows, oldest first.
    pub bars: Vec<EnrichedBar>,
}

impl EnrichedSeries {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// `true` when there are no rows.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The most recent row.
    pub fn latest(&self) -> Option<&EnrichedBar> {
        self.bars.last()
    }

    /// The window's daily volatility, shared by every row.
    pub fn daily_volatility(&self) -> Option<f64> {
        self.bars.first().map(|b| b.daily_volatility)
    }

    /// The window's annualized volatility in percent.
    pub fn annualized_volatility(&self) -> Option<f64> {
        self.bars.first().map(|b| b.annualized_volatility)
    }
}

/// Enriches `series`. Pure: the same input always yields the same output.
pub fn enrich(series: &BarSeries) -> Result<EnrichedSeries, ComputationError> {
    let bars = &series.bars;
    if bars.is_empty() {
        return Err(ComputationError::EmptySeries {
            symbol: series.symbol.clone(),
        });
    }

    let (simple, log) = returns(bars)?;
    let daily = sample_std_dev(&log);
    let annualized = daily * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma50 = trailing_mean(&closes, SHORT_MA_WINDOW);
    let ma200 = trailing_mean(&closes, LONG_MA_WINDOW);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let row = EnrichedBar {
                bar: bar.clone(),
                simple_return: simple[i],
                log_return: log[i],
                daily_volatility: daily,
                annualized_volatility: annualized,
                ma50: ma50[i],
                ma200: ma200[i],
            };
            check_finite(&row).map(|()| row)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        symbol = %series.symbol,
        rows = rows.len(),
        daily_volatility = daily,
        "series enriched"
    );
    Ok(EnrichedSeries {
        symbol: series.symbol.clone(),
        bars: rows,
    })
}

fn returns(bars: &[Bar]) -> Result<(Vec<f64>, Vec<f64>), ComputationError> {
    let mut simple = Vec::with_capacity(bars.len());
    let mut log = Vec::with_capacity(bars.len());
    simple.push(0.0);
    log.push(0.0);

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        if prev.close == 0.0 || !prev.close.is_finite() {
            return Err(ComputationError::InvalidClose {
                date: bar.date,
                close: prev.close,
            });
        }
        let ratio = bar.close / prev.close;
        let (r, lr) = (ratio - 1.0, ratio.ln());
        if !r.is_finite() || !lr.is_finite() {
            return Err(ComputationError::NonFinite {
                date: bar.date,
                field: if r.is_finite() { "log_return" } else { "simple_return" },
            });
        }
        simple.push(r);
        log.push(lr);
    }
    Ok((simple, log))
}

/// Sample (n - 1) standard deviation; 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Trailing mean over at most `window` values ending at each index.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            values[from..=i].iter().mean()
        })
        .collect()
}

fn check_finite(row: &EnrichedBar) -> Result<(), ComputationError> {
    let fields = [
        ("close", row.bar.close),
        ("simple_return", row.simple_return),
        ("log_return", row.log_return),
        ("daily_volatility", row.daily_volatility),
        ("annualized_volatility", row.annualized_volatility),
        ("ma50", row.ma50),
        ("ma200", row.ma200),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some(&(field, _)) => Err(ComputationError::NonFinite {
            date: row.bar.date,
            field,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, TimeZone, Utc};
    use proptest::prelude::*;
    use shared_utils::calendar::is_business_day;

    use super::*;

    fn series(closes: &[f64]) -> BarSeries {
        let mut day = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut bars = Vec::new();
        for &close in closes {
            while !is_business_day(day) {
                day = day + Days::new(1);
            }
            bars.push(Bar {
                date: day,
                open: close,
                high: close,
                low: close,
                close,
                adj_close: close,
                volume: 1_000,
                timestamp: Utc.from_utc_datetime(&day.and_hms_opt(21, 0, 0).unwrap()),
            });
            day = day + Days::new(1);
        }
        BarSeries::new("AAPL", bars)
    }

    #[test]
    fn two_bar_scenario() {
        let out = enrich(&series(&[100.0, 110.0])).unwrap();
        let (a, b) = (&out.bars[0], &out.bars[1]);

        assert_eq!(a.simple_return, 0.0);
        assert_eq!(a.log_return, 0.0);
        assert!((b.simple_return - 0.1).abs() < 1e-12);
        assert!((b.log_return - 1.1f64.ln()).abs() < 1e-12);

        let expected = 1.1f64.ln() / 2f64.sqrt();
        for row in &out.bars {
            assert!((row.daily_volatility - expected).abs() < 1e-12);
            assert!((row.annualized_volatility - expected * 252f64.sqrt() * 100.0).abs() < 1e-9);
        }
        assert_eq!((a.ma50, b.ma50), (100.0, 105.0));
        assert_eq!((a.ma200, b.ma200), (100.0, 105.0));
    }

    #[test]
    fn single_bar_has_zero_volatility() {
        let out = enrich(&series(&[42.0])).unwrap();
        let row = &out.bars[0];
        assert_eq!(row.simple_return, 0.0);
        assert_eq!(row.log_return, 0.0);
        assert_eq!(row.daily_volatility, 0.0);
        assert_eq!(row.annualized_volatility, 0.0);
        assert_eq!(row.ma50, 42.0);
        assert_eq!(row.ma200, 42.0);
    }

    #[test]
    fn empty_series_is_an_error() {
        let err = enrich(&BarSeries::empty("AAPL")).unwrap_err();
        assert_eq!(
            err,
            ComputationError::EmptySeries {
                symbol: "AAPL".into()
            }
        );
    }

    #[test]
    fn zero_previous_close_is_rejected() {
        let err = enrich(&series(&[0.0, 5.0])).unwrap_err();
        assert!(matches!(err, ComputationError::InvalidClose { close, .. } if close == 0.0));
    }

    #[test]
    fn missing_previous_close_is_rejected() {
        let err = enrich(&series(&[f64::NAN, 5.0])).unwrap_err();
        assert!(matches!(err, ComputationError::InvalidClose { close, .. } if close.is_nan()));
    }

    #[test]
    fn missing_last_close_is_non_finite() {
        let out = series(&[10.0, 11.0, f64::NAN]);
        let last = out.last().unwrap().date;
        let err = enrich(&out).unwrap_err();
        assert_eq!(
            err,
            ComputationError::NonFinite {
                date: last,
                field: "simple_return",
            }
        );
    }

    #[test]
    fn drop_to_zero_is_non_finite() {
        let err = enrich(&series(&[10.0, 0.0, 5.0])).unwrap_err();
        assert!(matches!(
            err,
            ComputationError::NonFinite {
                field: "log_return",
                ..
            }
        ));
    }

    #[test]
    fn negative_ratio_is_non_finite() {
        let err = enrich(&series(&[10.0, -5.0])).unwrap_err();
        assert!(matches!(
            err,
            ComputationError::NonFinite {
                field: "log_return",
                ..
            }
        ));
    }

    #[test]
    fn moving_average_windows_cap_at_their_length() {
        let closes: Vec<f64> = (1..=60).map(f64::from).collect();
        let out = enrich(&series(&closes)).unwrap();
        // last 50 closes are 11..=60
        assert!((out.bars[59].ma50 - 35.5).abs() < 1e-9);
        // fewer than 200 bars: the long average covers everything so far
        assert!((out.bars[59].ma200 - 30.5).abs() < 1e-9);
    }

    #[test]
    fn trailing_mean_with_zero_window_behaves_like_one() {
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0], 0), vec![1.0, 2.0, 3.0]);
    }

    proptest! {
        #[test]
        fn identical_closes_give_exact_averages(close in 0.01f64..10_000.0, n in 1usize..260) {
            let out = enrich(&series(&vec![close; n])).unwrap();
            for row in &out.bars {
                prop_assert_eq!(row.ma50, close);
                prop_assert_eq!(row.ma200, close);
                prop_assert_eq!(row.simple_return, 0.0);
                prop_assert_eq!(row.daily_volatility, 0.0);
            }
        }

        #[test]
        fn volatility_is_broadcast_and_deterministic(
            closes in prop::collection::vec(1.0f64..500.0, 1..120)
        ) {
            let input = series(&closes);
            let first = enrich(&input).unwrap();
            let second = enrich(&input).unwrap();
            prop_assert_eq!(&first, &second);

            let vol = first.daily_volatility().unwrap();
            prop_assert!(vol >= 0.0);
            prop_assert!(first.bars.iter().all(|r| r.daily_volatility == vol));
            prop_assert_eq!(first.bars[0].simple_return, 0.0);
            prop_assert_eq!(first.bars[0].log_return, 0.0);
        }
    }
}
