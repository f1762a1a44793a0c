//! One dashboard session.
//!
//! A [`Dashboard`] owns the configuration, the clock, the history loader (and
//! with it the session cache) and the optional price model. Each interaction
//! runs the pipeline to completion: load, enrich, then chart or predict.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use shared_utils::{
    calendar::nearest_business_day,
    clock::{Clock, SystemClock},
};
use stock_history::{
    HistoryLoader,
    providers::{DataProvider, build_provider},
};
use tracing::info;

use crate::{
    chart::{ChartData, PlotMode, build_chart},
    config::DashboardConfig,
    enrich::{EnrichedSeries, enrich},
    errors::DashboardError,
    features::{FeatureVector, SentimentCounts},
    prediction::{LinearRegressionPredictor, Prediction, PricePredictor, predict_close},
};

/// An inclusive range of business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

/// The enriched window currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Range the series was loaded for.
    pub range: DateRange,
    /// Enriched bars.
    pub series: EnrichedSeries,
}

/// Session state shared by every interaction.
pub struct Dashboard {
    config: DashboardConfig,
    clock: Arc<dyn Clock>,
    loader: HistoryLoader,
    predictor: Option<Box<dyn PricePredictor>>,
}

impl Dashboard {
    /// Builds a session around `provider`, reading "today" from `clock`.
    pub fn new(
        config: DashboardConfig,
        provider: Box<dyn DataProvider + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut loader = HistoryLoader::new(provider).with_clock(Arc::clone(&clock));
        if let Some(earliest) = config.earliest_date {
            loader = loader.with_earliest(earliest);
        }
        Self {
            config,
            clock,
            loader,
            predictor: None,
        }
    }

    /// Builds the configured provider and loads the model if one is configured.
    pub fn from_config(config: DashboardConfig) -> Result<Self, DashboardError> {
        let provider = build_provider(config.provider, config.requests_per_minute)?;
        info!(provider = %config.provider, symbols = ?config.symbols, "starting dashboard session");

        let predictor = config
            .model_path
            .as_ref()
            .map(LinearRegressionPredictor::load)
            .transpose()?;

        let dashboard = Self::new(config, provider, Arc::new(SystemClock));
        Ok(match predictor {
            Some(p) => dashboard.with_predictor(Box::new(p)),
            None => dashboard,
        })
    }

    /// Uses `predictor` for [`Dashboard::predict`].
    pub fn with_predictor(mut self, predictor: Box<dyn PricePredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// The session configuration.
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The history loader and its cache.
    pub fn loader(&self) -> &HistoryLoader {
        &self.loader
    }

    /// Symbols offered by the selector.
    pub fn symbols(&self) -> &[String] {
        &self.config.symbols
    }

    /// Today snapped onto a business day, and the start `lookback_days` earlier, also snapped.
    pub fn default_range(&self) -> DateRange {
        let today = self.clock.business_today();
        let start = today
            .checked_sub_days(Days::new(self.config.lookback_days.into()))
            .unwrap_or(NaiveDate::MIN);
        DateRange {
            start: nearest_business_day(start),
            end: today,
        }
    }

    /// Validates a user selection and snaps it onto business days.
    ///
    /// `start` must lie in `[default start, today - 1]` and `end` in `[start, today]`.
    pub fn select_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DateRange, DashboardError> {
        let default = self.default_range();
        let today = default.end;
        let out_of_bounds = |reason: String| DashboardError::Range { start, end, reason };

        if start < default.start {
            return Err(out_of_bounds(format!("start is before {}", default.start)));
        }
        if start >= today {
            return Err(out_of_bounds(format!("start must be before {today}")));
        }
        if end < start {
            return Err(out_of_bounds("end is before start".to_string()));
        }
        if end > today {
            return Err(out_of_bounds(format!("end is after {today}")));
        }

        Ok(DateRange {
            start: nearest_business_day(start),
            end: nearest_business_day(end),
        })
    }

    /// Like [`Dashboard::select_range`], with missing bounds taken from the default range.
    pub fn select_or_default(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<DateRange, DashboardError> {
        let default = self.default_range();
        self.select_range(start.unwrap_or(default.start), end.unwrap_or(default.end))
    }

    /// Normalizes `symbol` and checks it is offered.
    pub fn resolve_symbol(&self, symbol: &str) -> Result<String, DashboardError> {
        let symbol = symbol.trim().to_uppercase();
        if self.config.symbols.contains(&symbol) {
            Ok(symbol)
        } else {
            Err(DashboardError::UnknownSymbol { symbol })
        }
    }

    /// Loads and enriches `symbol` over `range`.
    pub async fn view(&self, symbol: &str, range: DateRange) -> Result<DashboardView, DashboardError> {
        let symbol = self.resolve_symbol(symbol)?;
        let bars = self.loader.load(&symbol, range.start, range.end).await?;
        let series = enrich(&bars)?;
        Ok(DashboardView { range, series })
    }

    /// Chart series for `view`.
    pub fn chart(&self, view: &DashboardView, mode: PlotMode) -> ChartData {
        build_chart(&view.series, mode)
    }

    /// Predicts the next close from the latest bar of `view` and `sentiment`.
    pub fn predict(
        &self,
        view: &DashboardView,
        sentiment: SentimentCounts,
    ) -> Result<Prediction, DashboardError> {
        let predictor = self.predictor.as_deref().ok_or(DashboardError::NoPredictor)?;
        let features = FeatureVector::from_latest(&view.series, sentiment)?;
        Ok(predict_close(predictor, &features)?)
    }
}
