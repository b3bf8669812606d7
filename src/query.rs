//! Cached, retrying access to the aggregated event feed.
//!
//! This module wraps the whole aggregation run — not individual source
//! requests — in two layers:
//!
//! - [`RetryAggregate`]: Decorator that adds bounded retries with exponential
//!   backoff and jitter to any [`AggregateEvents`] implementation
//! - [`CachedEvents`]: Freshness-window cache over the decorated aggregation,
//!   exposing a `{data, is_loading, error}` snapshot and persisting the last
//!   successful result through the key-value store
//!
//! # Refresh Strategy
//!
//! - A successful result is reused for 30 minutes before a refetch
//! - A failed aggregation is retried up to 2 times, delays doubling from
//!   1 second and capped at 30 seconds, with random jitter (0-250ms)
//! - A refresh is a single run-to-completion unit guarded by an async mutex;
//!   abandoned callers stop waiting, in-flight requests finish naturally

use crate::aggregate::{self, FeedConfig};
use crate::models::ParsedEvent;
use crate::storage::KeyValueStore;
use rand::{rng, Rng};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// How long a successful aggregation is reused before a refetch.
pub const FRESHNESS_WINDOW: StdDuration = StdDuration::from_secs(30 * 60);

/// How many times a failed aggregation is retried before surfacing the error.
pub const MAX_RETRIES: usize = 2;

const BASE_RETRY_DELAY: StdDuration = StdDuration::from_secs(1);
const LAST_BOARD_KEY: &str = "events.last";

/// Trait for running one full aggregation pass.
///
/// Implementors fetch every configured source and return the merged event
/// list. The abstraction exists so decorators (retry) and the cache can wrap
/// any backend, including test stubs.
pub trait AggregateEvents {
    /// Run one aggregation pass over all configured sources.
    async fn aggregate(&self) -> Result<Vec<ParsedEvent>, Box<dyn Error>>;
}

/// Production aggregator: fans out to the configured feed sources.
#[derive(Debug)]
pub struct FeedAggregator {
    config: FeedConfig,
}

impl FeedAggregator {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }
}

impl AggregateEvents for FeedAggregator {
    async fn aggregate(&self) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
        aggregate::collect_events(&self.config).await
    }
}

/// Wrapper that adds bounded retries to any [`AggregateEvents`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAggregate<T> {
    /// The underlying aggregator to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAggregate<T>
where
    T: AggregateEvents,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAggregate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAggregate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AggregateEvents for RetryAggregate<T>
where
    T: AggregateEvents,
{
    #[instrument(level = "info", skip_all)]
    async fn aggregate(&self) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.aggregate().await {
                Ok(events) => {
                    return Ok(events);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "aggregate() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "aggregate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// What the consuming layer sees: the cached event list (possibly a stale
/// last-good copy), whether a refresh is currently running, and the most
/// recent aggregation error if the data could not be refreshed.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub data: Option<Arc<Vec<ParsedEvent>>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct CacheState {
    store: Box<dyn KeyValueStore>,
    data: Option<Arc<Vec<ParsedEvent>>>,
    fetched_at: Option<Instant>,
    error: Option<String>,
}

/// Freshness-window cache over a retried aggregation.
///
/// On construction the last persisted board is loaded as the initial cached
/// value (marked stale, so the first [`CachedEvents::events`] call still
/// refreshes). On a successful refresh the result is persisted back. On a
/// failed refresh the previous data is kept and the error is surfaced
/// alongside it.
pub struct CachedEvents<T> {
    fetcher: RetryAggregate<T>,
    freshness: StdDuration,
    state: Mutex<CacheState>,
}

impl<T> CachedEvents<T>
where
    T: AggregateEvents,
{
    pub fn new(fetcher: T, store: Box<dyn KeyValueStore>) -> Self {
        Self::with_options(fetcher, store, FRESHNESS_WINDOW, MAX_RETRIES, BASE_RETRY_DELAY)
    }

    /// Fully parameterized constructor; `new` passes the production values.
    pub fn with_options(
        fetcher: T,
        store: Box<dyn KeyValueStore>,
        freshness: StdDuration,
        max_retries: usize,
        base_delay: StdDuration,
    ) -> Self {
        let data = load_last_board(store.as_ref());
        if let Some(events) = &data {
            info!(count = events.len(), "Loaded persisted event board");
        }
        Self {
            fetcher: RetryAggregate::new(fetcher, max_retries, base_delay),
            freshness,
            state: Mutex::new(CacheState {
                store,
                data,
                fetched_at: None,
                error: None,
            }),
        }
    }

    /// Return the cached events, refreshing first if the cache is stale.
    ///
    /// The refresh runs to completion under the state lock; concurrent
    /// callers queue up and then see the fresh result without refetching.
    #[instrument(level = "info", skip_all)]
    pub async fn events(&self) -> QuerySnapshot {
        let mut state = self.state.lock().await;

        if let (Some(data), Some(fetched_at)) = (&state.data, state.fetched_at) {
            if fetched_at.elapsed() < self.freshness {
                return QuerySnapshot {
                    data: Some(Arc::clone(data)),
                    is_loading: false,
                    error: None,
                };
            }
        }

        match self.fetcher.aggregate().await {
            Ok(events) => {
                let data = Arc::new(events);
                persist_last_board(state.store.as_mut(), &data);
                state.data = Some(Arc::clone(&data));
                state.fetched_at = Some(Instant::now());
                state.error = None;
                info!(count = data.len(), "Event cache refreshed");
                QuerySnapshot {
                    data: Some(data),
                    is_loading: false,
                    error: None,
                }
            }
            Err(e) => {
                // Keep whatever data we had; leave fetched_at untouched so
                // the next call tries again.
                state.error = Some(e.to_string());
                warn!(error = %e, "Event cache refresh failed; serving last-good data");
                QuerySnapshot {
                    data: state.data.as_ref().map(Arc::clone),
                    is_loading: false,
                    error: state.error.clone(),
                }
            }
        }
    }

    /// Non-blocking view of the cache.
    ///
    /// While a refresh holds the state lock this reports `is_loading` with
    /// no data, mirroring an in-flight query; otherwise it returns the
    /// current cached state without triggering a refresh.
    pub fn peek(&self) -> QuerySnapshot {
        match self.state.try_lock() {
            Ok(state) => QuerySnapshot {
                data: state.data.as_ref().map(Arc::clone),
                is_loading: false,
                error: state.error.clone(),
            },
            Err(_) => QuerySnapshot {
                data: None,
                is_loading: true,
                error: None,
            },
        }
    }
}

fn load_last_board(store: &dyn KeyValueStore) -> Option<Arc<Vec<ParsedEvent>>> {
    let json = store.get(LAST_BOARD_KEY)?;
    match serde_json::from_str::<Vec<ParsedEvent>>(&json) {
        Ok(events) => Some(Arc::new(events)),
        Err(e) => {
            warn!(error = %e, "Persisted event board unreadable; ignoring");
            None
        }
    }
}

fn persist_last_board(store: &mut dyn KeyValueStore, events: &[ParsedEvent]) {
    match serde_json::to_string(events) {
        Ok(json) => store.set(LAST_BOARD_KEY, &json),
        Err(e) => warn!(error = %e, "Failed to serialize event board for persistence"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventCategory;
    use crate::storage::{DiskStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(id: &str) -> ParsedEvent {
        ParsedEvent {
            id: id.to_string(),
            title: format!("Event {id}"),
            date: "Aug 6, 2030".to_string(),
            time: "7:00 PM".to_string(),
            end_time: None,
            location: "Online Event".to_string(),
            category: EventCategory::Other,
            description: String::new(),
            url: None,
            image_url: None,
            calendar_source: None,
            is_free: None,
        }
    }

    /// Stub that fails its first `fail_first` calls, then succeeds.
    struct StubAggregator {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl StubAggregator {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AggregateEvents for StubAggregator {
        async fn aggregate(&self) -> Result<Vec<ParsedEvent>, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(format!("simulated failure #{n}").into())
            } else {
                Ok(vec![event("stub")])
            }
        }
    }

    fn test_cache(
        fail_first: usize,
        freshness: StdDuration,
    ) -> CachedEvents<StubAggregator> {
        CachedEvents::with_options(
            StubAggregator::new(fail_first),
            Box::new(MemoryStore::new()),
            freshness,
            MAX_RETRIES,
            StdDuration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_fresh_cache_reuses_result() {
        let cache = test_cache(0, StdDuration::from_secs(60));

        let first = cache.events().await;
        let second = cache.events().await;

        assert!(first.data.is_some());
        assert!(second.data.is_some());
        assert_eq!(cache.fetcher.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let cache = test_cache(0, StdDuration::ZERO);

        cache.events().await;
        cache.events().await;

        assert_eq!(cache.fetcher.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let cache = test_cache(1, StdDuration::from_secs(60));

        let snapshot = cache.events().await;

        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.data.unwrap().len(), 1);
        // one failure + one successful retry
        assert_eq!(cache.fetcher.inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let cache = test_cache(10, StdDuration::from_secs(60));

        let snapshot = cache.events().await;

        assert!(snapshot.error.is_some());
        assert!(snapshot.data.is_none());
        // initial attempt + MAX_RETRIES retries, then give up
        assert_eq!(cache.fetcher.inner.calls(), 1 + MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_failure_serves_persisted_last_good_board() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");

        // First run succeeds and persists its board.
        let cache = CachedEvents::with_options(
            StubAggregator::new(0),
            Box::new(DiskStore::open(store_path.clone())),
            StdDuration::from_secs(60),
            MAX_RETRIES,
            StdDuration::from_millis(1),
        );
        assert!(cache.events().await.error.is_none());
        drop(cache);

        // Second run can never fetch, but still serves the persisted board
        // alongside the error.
        let cache = CachedEvents::with_options(
            StubAggregator::new(usize::MAX),
            Box::new(DiskStore::open(store_path)),
            StdDuration::from_secs(60),
            MAX_RETRIES,
            StdDuration::from_millis(1),
        );
        let snapshot = cache.events().await;
        assert!(snapshot.error.is_some());
        let data = snapshot.data.expect("last-good board should survive");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].id, "stub");
    }

    #[tokio::test]
    async fn test_peek_does_not_refresh() {
        let cache = test_cache(0, StdDuration::from_secs(60));

        let snapshot = cache.peek();
        assert!(snapshot.data.is_none());
        assert!(!snapshot.is_loading);
        assert_eq!(cache.fetcher.inner.calls(), 0);
    }
}
