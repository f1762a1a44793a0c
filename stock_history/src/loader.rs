//! Daily history loading: range normalization, provider fetch, caching.
//!
//! [`HistoryLoader::load`] is the single entry point. It
//! 1. rejects reversed ranges,
//! 2. snaps both ends onto business days,
//! 3. rejects ranges that miss the supported window entirely,
//! 4. serves the series from the [`BarCache`] or asks the provider for
//!    `[start, end + 1 day)`, the end bound being exclusive on the vendor side,
//! 5. fails with [`LoadError::NoData`] when nothing came back.

pub mod cache;

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use shared_utils::{
    calendar::nearest_business_day,
    clock::{Clock, SystemClock},
};
use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::{
    errors::{InconsistentSnafu, InvalidRangeSnafu, LoadError, NoDataSnafu, ProviderSnafu},
    loader::cache::{BarCache, CacheKey},
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::DataProvider,
};

/// Loads and memoizes daily bars for one session.
pub struct HistoryLoader {
    provider: Box<dyn DataProvider + Send + Sync>,
    clock: Arc<dyn Clock>,
    cache: BarCache,
    earliest: Option<NaiveDate>,
}

impl HistoryLoader {
    pub fn new(provider: Box<dyn DataProvider + Send + Sync>) -> Self {
        Self {
            provider,
            clock: Arc::new(SystemClock),
            cache: BarCache::new(),
            earliest: None,
        }
    }

    /// Use `clock` to decide what "today" is.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ranges ending before `earliest` are rejected.
    pub fn with_earliest(mut self, earliest: NaiveDate) -> Self {
        self.earliest = Some(earliest);
        self
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    /// Validates and snaps a caller range, returning the inclusive business-day bounds.
    pub fn resolve_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate), LoadError> {
        ensure!(
            start <= end,
            InvalidRangeSnafu {
                start,
                end,
                reason: "start is after end",
            }
        );

        let (start, end) = (nearest_business_day(start), nearest_business_day(end));

        let today = self.clock.business_today();
        ensure!(
            start <= today,
            InvalidRangeSnafu {
                start,
                end,
                reason: format!("range starts after {today}"),
            }
        );
        if let Some(earliest) = self.earliest {
            ensure!(
                end >= earliest,
                InvalidRangeSnafu {
                    start,
                    end,
                    reason: format!("range ends before {earliest}"),
                }
            );
        }
        Ok((start, end))
    }

    /// Loads the bars of `symbol` between `start` and `end`, both inclusive.
    ///
    /// Both ends are snapped onto business days first. Repeated calls with the
    /// same snapped key are served from the cache.
    pub async fn load(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<BarSeries>, LoadError> {
        let (start, end) = self.resolve_range(start, end)?;
        let key = CacheKey::new(symbol, start, end);
        self.cache.get_or_load(&key, || self.fetch(&key)).await
    }

    /// Drops any cached series for the range and fetches it again.
    ///
    /// Use this when the range ends today and the last bar may have been provisional.
    pub async fn reload(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<BarSeries>, LoadError> {
        let (snapped_start, snapped_end) = self.resolve_range(start, end)?;
        if self
            .cache
            .invalidate(&CacheKey::new(symbol, snapped_start, snapped_end))
        {
            debug!(%symbol, "evicted cached history for reload");
        }
        self.load(symbol, start, end).await
    }

    async fn fetch(&self, key: &CacheKey) -> Result<BarSeries, LoadError> {
        // vendors treat the end bound as exclusive
        let exclusive_end = key.end + Days::new(1);
        let params = BarsRequestParams::new(key.symbol.clone(), key.start, exclusive_end);

        info!(%key, "fetching history from provider");
        let series = self
            .provider
            .fetch_bars(params)
            .await
            .context(ProviderSnafu {
                symbol: key.symbol.as_str(),
            })?;

        ensure!(
            series.symbol.eq_ignore_ascii_case(&key.symbol),
            InconsistentSnafu {
                symbol: key.symbol.as_str(),
                message: format!("got bars for {}", series.symbol),
            }
        );

        // providers normally hand back a normalized series already
        let mut series = match series.validate() {
            Ok(()) => BarSeries {
                symbol: key.symbol.clone(),
                bars: series.bars,
            },
            Err(err) => {
                debug!(%key, %err, "normalizing provider series");
                BarSeries::new(key.symbol.clone(), series.bars)
            }
        };
        series.retain_dates(key.start, key.end);

        ensure!(
            !series.is_empty(),
            NoDataSnafu {
                symbol: key.symbol.as_str(),
                start: key.start,
                end: key.end,
            }
        );
        debug!(%key, bars = series.len(), "history loaded");
        Ok(series)
    }
}
