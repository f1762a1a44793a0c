//! Session-owned memo of loaded series.
//!
//! Each key maps to a `tokio::sync::OnceCell`, so concurrent callers asking
//! for the same key share one provider fetch. A failed fetch leaves the cell
//! empty and the next caller tries again; errors are never memoized.
//!
//! There is no TTL: bars for past dates do not change. A range ending today
//! may hold a provisional bar, callers refresh it with
//! [`HistoryLoader::reload`](crate::loader::HistoryLoader::reload).

use std::{fmt, future::Future, sync::Arc};

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::models::bar_series::BarSeries;

/// Cache key: the symbol plus the snapped, inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..={}]", self.symbol, self.start, self.end)
    }
}

type Slot = Arc<OnceCell<Arc<BarSeries>>>;

#[derive(Default)]
pub struct BarCache {
    entries: DashMap<CacheKey, Slot>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached series for `key`, running `load` only if no caller has
    /// populated it yet.
    pub async fn get_or_load<F, Fut, E>(&self, key: &CacheKey, load: F) -> Result<Arc<BarSeries>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BarSeries, E>>,
    {
        // clone the slot out so no shard lock is held across the await
        let slot: Slot = Arc::clone(&self.entries.entry(key.clone()).or_default());

        if let Some(hit) = slot.get() {
            debug!(%key, "history cache hit");
            return Ok(Arc::clone(hit));
        }

        let result = slot
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await
            .map(Arc::clone);

        if result.is_err() {
            // only prune our own empty slot, and only if no waiter still holds it
            self.entries.remove_if(key, |_, s| {
                Arc::ptr_eq(s, &slot) && !s.initialized() && Arc::strong_count(s) == 2
            });
        }
        result
    }

    /// The cached series for `key`, if it has been loaded.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<BarSeries>> {
        self.entries
            .get(key)
            .and_then(|slot| slot.get().map(Arc::clone))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Forgets `key`. Returns `true` if a loaded series was evicted.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|(_, slot)| slot.initialized())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of loaded series.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(
            symbol,
            NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 6).unwrap(),
        )
    }

    #[tokio::test]
    async fn second_lookup_does_not_reload() {
        let cache = BarCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let series = cache
                .get_or_load(&key("AAPL"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(BarSeries::empty("AAPL"))
                })
                .await
                .unwrap();
            assert_eq!(series.symbol, "AAPL");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn errors_are_not_memoized() {
        let cache = BarCache::new();

        let err = cache
            .get_or_load(&key("ZZZZ"), || async { Err::<BarSeries, _>("boom") })
            .await;
        assert_eq!(err.unwrap_err(), "boom");
        assert!(cache.is_empty());
        assert!(!cache.contains(&key("ZZZZ")));

        let ok = cache
            .get_or_load(&key("ZZZZ"), || async {
                Ok::<_, &str>(BarSeries::empty("ZZZZ"))
            })
            .await;
        assert!(ok.is_ok());
        assert!(cache.contains(&key("ZZZZ")));
    }

    #[tokio::test]
    async fn waiter_result_is_kept_when_first_load_fails() {
        let cache = BarCache::new();
        let calls = &AtomicUsize::new(0);
        let load = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if n == 0 {
                Err("first load fails")
            } else {
                Ok(BarSeries::empty("AAPL"))
            }
        };

        let k = key("AAPL");
        let (a, b) = tokio::join!(
            cache.get_or_load(&k, load),
            cache.get_or_load(&k, load),
        );
        // whichever call ran the loader first failed, the other one succeeded
        assert!(a.is_ok() != b.is_ok());
        assert_eq!(cache.len(), 1);

        cache.get_or_load(&key("AAPL"), load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_does_not_evict_a_newer_slot() {
        let cache = BarCache::new();
        let (fail_stale, stale_gate) = oneshot::channel::<()>();
        let (finish_fresh, fresh_gate) = oneshot::channel::<()>();

        // the stale load is evicted by a reload and fails while the fresh one is in flight
        let stale = async {
            let result = cache
                .get_or_load(&key("AAPL"), move || async move {
                    stale_gate.await.ok();
                    Err::<BarSeries, _>("stale")
                })
                .await;
            finish_fresh.send(()).ok();
            result
        };
        let fresh = async {
            tokio::task::yield_now().await;
            cache.invalidate(&key("AAPL"));
            cache
                .get_or_load(&key("AAPL"), move || async move {
                    fail_stale.send(()).ok();
                    fresh_gate.await.ok();
                    Ok::<_, &str>(BarSeries::empty("AAPL"))
                })
                .await
        };

        let (stale, fresh) = tokio::join!(stale, fresh);
        assert!(stale.is_err());
        assert!(fresh.is_ok());
        assert!(cache.contains(&key("AAPL")));
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_load() {
        let cache = BarCache::new();
        cache
            .get_or_load(&key("AAPL"), || async { Ok::<_, ()>(BarSeries::empty("AAPL")) })
            .await
            .unwrap();

        assert!(cache.invalidate(&key("AAPL")));
        assert!(!cache.invalidate(&key("AAPL")));
        assert!(cache.get(&key("AAPL")).is_none());
    }

    #[test]
    fn key_display() {
        assert_eq!(key("AAPL").to_string(), "AAPL[2023-01-03..=2023-01-06]");
    }
}
