//! Renderer-agnostic chart series.
//!
//! [`build_chart`] turns an [`EnrichedSeries`] into two stacked panels that
//! share the date axis: candlesticks with the MA50/MA200 overlays on top, and
//! either daily returns in percent or traded volume below.

use std::{fmt, str::FromStr};

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::enrich::EnrichedSeries;

/// What the lower panel shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotMode {
    /// Daily simple return in percent.
    #[default]
    Returns,
    /// Shares traded.
    Volume,
}

impl fmt::Display for PlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotMode::Returns => f.write_str("returns"),
            PlotMode::Volume => f.write_str("volume"),
        }
    }
}

impl FromStr for PlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "returns" | "return" => Ok(PlotMode::Returns),
            "volume" => Ok(PlotMode::Volume),
            other => Err(format!("unknown plot mode: {other}")),
        }
    }
}

/// Quick range buttons over the date axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangePreset {
    /// Last month.
    OneMonth,
    /// Last three months.
    ThreeMonths,
    /// Last six months.
    SixMonths,
    /// Last year.
    OneYear,
    /// Last two years.
    TwoYears,
    /// Everything loaded.
    All,
}

impl RangePreset {
    /// Every preset, in button order.
    pub const ALL: [RangePreset; 6] = [
        RangePreset::OneMonth,
        RangePreset::ThreeMonths,
        RangePreset::SixMonths,
        RangePreset::OneYear,
        RangePreset::TwoYears,
        RangePreset::All,
    ];

    /// Button caption.
    pub fn label(self) -> &'static str {
        match self {
            RangePreset::OneMonth => "1M",
            RangePreset::ThreeMonths => "3M",
            RangePreset::SixMonths => "6M",
            RangePreset::OneYear => "1Y",
            RangePreset::TwoYears => "2Y",
            RangePreset::All => "All",
        }
    }

    fn months(self) -> Option<u32> {
        match self {
            RangePreset::OneMonth => Some(1),
            RangePreset::ThreeMonths => Some(3),
            RangePreset::SixMonths => Some(6),
            RangePreset::OneYear => Some(12),
            RangePreset::TwoYears => Some(24),
            RangePreset::All => None,
        }
    }

    /// First visible date when the axis ends at `last` and data starts at `first`.
    pub fn visible_start(self, first: NaiveDate, last: NaiveDate) -> NaiveDate {
        self.months()
            .and_then(|m| last.checked_sub_months(Months::new(m)))
            .map_or(first, |start| start.max(first))
    }
}

/// One candlestick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    /// Trading day.
    pub date: NaiveDate,
    /// Open.
    pub open: f64,
    /// High.
    pub high: f64,
    /// Low.
    pub low: f64,
    /// Close.
    pub close: f64,
}

/// A value on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// X coordinate.
    pub date: NaiveDate,
    /// Y coordinate.
    pub value: f64,
}

/// A named line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    /// Legend name.
    pub name: String,
    /// Points, oldest first.
    pub points: Vec<Point>,
}

impl LineSeries {
    /// Builds a line from `(date, value)` pairs.
    pub fn new(name: impl Into<String>, points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            name: name.into(),
            points: points
                .into_iter()
                .map(|(date, value)| Point { date, value })
                .collect(),
        }
    }
}

/// Axis decoration of a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    /// Y axis title.
    pub title: String,
    /// Suffix appended to tick labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_suffix: Option<String>,
}

/// One range button resolved against the loaded dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeButton {
    /// Caption.
    pub label: &'static str,
    /// First visible date.
    pub start: NaiveDate,
    /// Last visible date.
    pub end: NaiveDate,
}

/// Everything a renderer needs to draw the dashboard chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Chart title.
    pub title: String,
    /// Lower panel content.
    pub mode: PlotMode,
    /// Price panel candles.
    pub candles: Vec<Candle>,
    /// MA50 and MA200 overlays on the price panel.
    pub overlays: Vec<LineSeries>,
    /// Price panel axis.
    pub price_axis: Axis,
    /// Lower panel line.
    pub lower: LineSeries,
    /// Lower panel axis.
    pub lower_axis: Axis,
    /// Range selector buttons.
    pub ranges: Vec<RangeButton>,
}

/// Builds both panels for `series`.
pub fn build_chart(series: &EnrichedSeries, mode: PlotMode) -> ChartData {
    let rows = &series.bars;

    let candles = rows
        .iter()
        .map(|r| Candle {
            date: r.bar.date,
            open: r.bar.open,
            high: r.bar.high,
            low: r.bar.low,
            close: r.bar.close,
        })
        .collect();

    let overlays = vec![
        LineSeries::new("MA50", rows.iter().map(|r| (r.bar.date, r.ma50))),
        LineSeries::new("MA200", rows.iter().map(|r| (r.bar.date, r.ma200))),
    ];

    let (lower, lower_axis) = match mode {
        PlotMode::Returns => (
            LineSeries::new(
                "Return",
                rows.iter().map(|r| (r.bar.date, r.simple_return * 100.0)),
            ),
            Axis {
                title: "Stock Return".to_string(),
                tick_suffix: Some("%".to_string()),
            },
        ),
        PlotMode::Volume => (
            LineSeries::new(
                "Volume",
                rows.iter().map(|r| (r.bar.date, r.bar.volume as f64)),
            ),
            Axis {
                title: "Shares Traded".to_string(),
                tick_suffix: None,
            },
        ),
    };

    let ranges = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => RangePreset::ALL
            .iter()
            .map(|p| RangeButton {
                label: p.label(),
                start: p.visible_start(first.bar.date, last.bar.date),
                end: last.bar.date,
            })
            .collect(),
        _ => Vec::new(),
    };

    ChartData {
        title: format!("{} Stock", series.symbol),
        mode,
        candles,
        overlays,
        price_axis: Axis {
            title: "Stock Price".to_string(),
            tick_suffix: None,
        },
        lower,
        lower_axis,
        ranges,
    }
}
