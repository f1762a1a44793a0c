//! A collection of daily bars for a single symbol.

use chrono::NaiveDate;
use serde::Serialize;
use shared_utils::calendar::is_business_day;
use snafu::{Snafu, ensure};
use tracing::warn;

use crate::models::bar::Bar;

/// Violations of the series ordering invariant.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub))]
pub enum SeriesInvariantError {
    /// Two bars share a date, or a bar is older than its predecessor.
    #[snafu(display("bar dated {date} does not follow {previous}"))]
    NotIncreasing { previous: NaiveDate, date: NaiveDate },

    /// A bar falls on a Saturday or Sunday.
    #[snafu(display("bar dated {date} is not a business day"))]
    NonBusinessDay { date: NaiveDate },
}

/// Daily bars for one symbol, ascending by date.
///
/// Invariant (established by [`BarSeries::new`]): dates are unique, strictly
/// increasing, and only fall on business days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    /// The symbol this data represents (e.g. "AAPL").
    pub symbol: String,
    /// The bars, oldest first.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Builds a series from bars in any order.
    ///
    /// Bars are sorted by timestamp; when several bars carry the same date the
    /// first one wins. Weekend bars are dropped.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.timestamp);

        let before = bars.len();
        let mut last: Option<NaiveDate> = None;
        bars.retain(|b| {
            if !is_business_day(b.date) || last.is_some_and(|d| b.date <= d) {
                return false;
            }
            last = Some(b.date);
            true
        });
        if bars.len() != before {
            warn!(
                %symbol,
                dropped = before - bars.len(),
                "dropped duplicate or non-business-day bars"
            );
        }

        Self { symbol, bars }
    }

    /// An empty series, as returned by providers that found nothing.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    /// Checks the ordering invariant without modifying the series.
    pub fn validate(&self) -> Result<(), SeriesInvariantError> {
        let mut previous: Option<NaiveDate> = None;
        for bar in &self.bars {
            ensure!(
                is_business_day(bar.date),
                NonBusinessDaySnafu { date: bar.date }
            );
            if let Some(previous) = previous {
                ensure!(
                    bar.date > previous,
                    NotIncreasingSnafu {
                        previous,
                        date: bar.date
                    }
                );
            }
            previous = Some(bar.date);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Keeps only bars whose date lies in `[start, end]`.
    pub fn retain_dates(&mut self, start: NaiveDate, end: NaiveDate) {
        self.bars.retain(|b| b.date >= start && b.date <= end);
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn bar(y: i32, m: u32, d: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: 1_000,
            timestamp: Utc.with_ymd_and_hms(y, m, d, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn new_sorts_and_dedupes() {
        let series = BarSeries::new(
            "AAPL",
            vec![
                bar(2023, 1, 5, 3.0),
                bar(2023, 1, 3, 1.0),
                bar(2023, 1, 4, 2.0),
                bar(2023, 1, 4, 9.0),
            ],
        );
        let closes: Vec<f64> = series.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn new_drops_weekend_bars() {
        // 2023-01-07 is a Saturday
        let series = BarSeries::new("AAPL", vec![bar(2023, 1, 6, 1.0), bar(2023, 1, 7, 2.0)]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn validate_reports_out_of_order_bars() {
        let series = BarSeries {
            symbol: "AAPL".into(),
            bars: vec![bar(2023, 1, 4, 1.0), bar(2023, 1, 3, 2.0)],
        };
        assert!(matches!(
            series.validate(),
            Err(SeriesInvariantError::NotIncreasing { .. })
        ));
    }

    #[test]
    fn retain_dates_is_inclusive() {
        let mut series = BarSeries::new(
            "AAPL",
            vec![bar(2023, 1, 3, 1.0), bar(2023, 1, 4, 2.0), bar(2023, 1, 5, 3.0)],
        );
        series.retain_dates(
            NaiveDate::from_ymd_opt(2023, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().unwrap().close, 2.0);
    }
}
