//! Input row for the next-day close model.
//!
//! The model was fit on `open, high, low, close, volume` of the latest trading
//! day plus three tweet sentiment counts. Column order matters and is fixed by
//! [`FeatureVector::FIELDS`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{enrich::EnrichedSeries, errors::FeatureError};

/// Largest accepted sentiment count.
pub const MAX_SENTIMENT: i64 = 10_000;

/// Positive, negative and neutral tweet counts entered by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    /// Positive count.
    pub pos: i64,
    /// Negative count.
    pub neg: i64,
    /// Neutral count.
    pub neutral: i64,
}

impl SentimentCounts {
    /// Builds validated counts.
    pub fn new(pos: i64, neg: i64, neutral: i64) -> Result<Self, FeatureError> {
        let counts = Self { pos, neg, neutral };
        counts.validate()?;
        Ok(counts)
    }

    /// Checks every count lies in `0..=MAX_SENTIMENT`.
    pub fn validate(&self) -> Result<(), FeatureError> {
        for (field, value) in [("pos", self.pos), ("neg", self.neg), ("neutral", self.neutral)] {
            if !(0..=MAX_SENTIMENT).contains(&value) {
                return Err(FeatureError::SentimentOutOfRange {
                    field,
                    value,
                    max: MAX_SENTIMENT,
                });
            }
        }
        Ok(())
    }
}

/// One model input row, keyed by the date of the bar it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Date of the latest bar.
    pub date: NaiveDate,
    /// Open of the latest bar.
    pub open: f64,
    /// High of the latest bar.
    pub high: f64,
    /// Low of the latest bar.
    pub low: f64,
    /// Close of the latest bar.
    pub close: f64,
    /// Volume of the latest bar.
    pub volume: u64,
    /// Positive sentiment count.
    pub pos: i64,
    /// Negative sentiment count.
    pub neg: i64,
    /// Neutral sentiment count.
    pub neutral: i64,
}

impl FeatureVector {
    /// Column order expected by the model.
    pub const FIELDS: [&'static str; 8] = [
        "open", "high", "low", "close", "volume", "pos", "neg", "neutral",
    ];

    /// Takes OHLCV from the most recent row of `series` and appends `sentiment`.
    pub fn from_latest(
        series: &EnrichedSeries,
        sentiment: SentimentCounts,
    ) -> Result<Self, FeatureError> {
        sentiment.validate()?;
        let latest = series.latest().ok_or_else(|| FeatureError::EmptySeries {
            symbol: series.symbol.clone(),
        })?;
        let bar = &latest.bar;

        Ok(Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            pos: sentiment.pos,
            neg: sentiment.neg,
            neutral: sentiment.neutral,
        })
    }

    /// Values in [`Self::FIELDS`] order.
    pub fn to_row(&self) -> [f64; 8] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume as f64,
            self.pos as f64,
            self.neg as f64,
            self.neutral as f64,
        ]
    }
}
