//! Named-key query and mutation orchestration
//!
//! **Problem**: views talking to the remote service by hand re-fetch the
//! same data, clobber each other's results, and keep rendering long after
//! they are gone.
//!
//! **Solution**: one process-local cache object owns every remote read.
//! Reads are keyed by name, auto-refreshed while mounted, invalidated by
//! writes, and retried with exponential backoff.
//!
//! **Architecture**:
//! - [`QueryClient`]: DashMap-backed entry store, passed by reference to
//!   every consumer (never a global)
//! - [`QueryClient::mount`]: one background refresh task per live query,
//!   cancelled when its guard drops
//! - [`QueryClient::run_mutation`]: write-through with key invalidation on
//!   success and no optimistic update
//! - [`retry`]: bounded exponential backoff, applied to reads only
//!
//! Each fetch carries a generation number; a result that arrives after a
//! newer fetch has started for the same key, or after the key was
//! invalidated, is disregarded, so stale responses can never overwrite
//! fresh data.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub mod retry;
pub mod stats;

pub use retry::{with_retry, RetryPolicy};
pub use stats::CacheStats;

/// Capacity of the change-notification channel. A lagging subscriber loses
/// old events and re-reads current states instead.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Error contract for query fetchers.
pub trait FetchError: fmt::Display {
    /// Whether retrying the same fetch can plausibly succeed.
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Convenience for ad-hoc fetchers; string errors never retry.
impl FetchError for String {}

/// Snapshot of one cached query as a consumer sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryState<T> {
    /// Never fetched, or mounted disabled.
    Idle,
    /// First fetch in flight, nothing cached yet.
    Loading,
    /// Last fetch succeeded. Stays `Ready` during background refreshes.
    Ready(T),
    /// Last fetch failed; earlier data, when present, is still served.
    Failed {
        error: String,
        last_data: Option<T>,
    },
}

impl<T> QueryState<T> {
    /// Data a view can render right now, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            QueryState::Failed { last_data, .. } => last_data.as_ref(),
            _ => None,
        }
    }

    /// Error message of the most recent failed fetch, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    /// Whether at least one fetch has completed, successfully or not.
    pub fn is_fetched(&self) -> bool {
        matches!(self, QueryState::Ready(_) | QueryState::Failed { .. })
    }
}

/// Change notification emitted to presentation-layer subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEvent {
    /// Cache key the event refers to; `"*"` for whole-cache events.
    pub key: String,
    pub kind: CacheEventKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEventKind {
    /// A fetch committed fresh data.
    Updated,
    /// A fetch failed after retries.
    Failed,
    /// The entry was marked stale.
    Invalidated,
    /// The whole cache was torn down.
    Cleared,
}

/// How a query should be mounted.
#[derive(Clone, Debug)]
pub struct QuerySpec {
    key: String,
    refetch_interval: Option<Duration>,
    retry: RetryPolicy,
    enabled: bool,
}

impl QuerySpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            refetch_interval: None,
            retry: RetryPolicy::default(),
            enabled: true,
        }
    }

    /// Re-fetch this often while mounted, on top of invalidation wake-ups.
    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// A disabled query mounts nothing and leaves its state [`QueryState::Idle`].
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Cached entry bookkeeping. Every mutation happens under the map's entry
/// lock, never across an await.
#[derive(Debug, Default)]
struct Entry {
    /// Last successfully committed payload.
    data: Option<serde_json::Value>,
    /// Message of the most recent failed fetch, cleared on success.
    error: Option<String>,
    /// A fetch for the current generation is in flight.
    in_flight: bool,
    /// Marked by `invalidate`; forces a re-fetch before the next use.
    stale: bool,
    /// Advanced by every fetch start and every invalidation; a commit
    /// carrying an older number is discarded.
    generation: u64,
}

// ============================================================================
// QUERY CLIENT
// ============================================================================

struct ClientInner {
    entries: DashMap<String, Entry>,
    wakers: DashMap<String, Arc<Notify>>,
    events: broadcast::Sender<CacheEvent>,
    stats: stats::StatCounters,
}

/// Process-local query/mutation orchestrator.
///
/// Cheap to clone; clones share the same cache. Construct one per app
/// session and pass it to every service that reads or writes remote state.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                entries: DashMap::new(),
                wakers: DashMap::new(),
                events,
                stats: stats::StatCounters::default(),
            }),
        }
    }

    /// Current state of a key without triggering any fetch.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> QueryState<T> {
        let entry = match self.inner.entries.get(key) {
            Some(entry) => entry,
            None => return QueryState::Idle,
        };

        let data = match entry.data.clone() {
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(key = %key, error = %e, "Cached value decode failed");
                    None
                }
            },
            None => None,
        };

        match (data, entry.error.clone()) {
            (Some(data), None) => QueryState::Ready(data),
            (last_data, Some(error)) => QueryState::Failed { error, last_data },
            (None, None) if entry.in_flight => QueryState::Loading,
            (None, None) => QueryState::Idle,
        }
    }

    /// Whether `key` has been marked for a mandatory re-fetch.
    pub fn is_stale(&self, key: &str) -> bool {
        self.inner
            .entries
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    /// Serve `key` from cache, or fetch it and commit the result.
    ///
    /// A stale or absent entry always fetches. Fetch failures are retried
    /// per `policy` while the error says it is retryable; the final error
    /// is returned and the previous data stays cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        policy: &RetryPolicy,
        mut fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: FetchError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(entry) = self.inner.entries.get(key) {
            if !entry.stale {
                if let Some(value) = entry.data.clone() {
                    drop(entry);
                    match serde_json::from_value::<T>(value) {
                        Ok(decoded) => {
                            self.inner.stats.record_hit();
                            debug!(key = %key, "Cache hit");
                            return Ok(decoded);
                        }
                        Err(e) => {
                            warn!(key = %key, error = %e, "Cached value decode failed, refetching");
                        }
                    }
                }
            }
        }

        self.inner.stats.record_miss();
        debug!(key = %key, "Cache miss");
        self.fetch_cycle(key, policy, &mut fetcher).await
    }

    /// Register a live query: fetch immediately, then re-fetch on every
    /// interval tick and invalidation wake-up until the returned guard is
    /// dropped.
    pub fn mount<T, E, F, Fut>(&self, spec: QuerySpec, mut fetcher: F) -> MountedQuery
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: FetchError + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let QuerySpec {
            key,
            refetch_interval,
            retry,
            enabled,
        } = spec;

        if !enabled {
            debug!(key = %key, "Query mounted disabled; state stays idle");
            return MountedQuery {
                key,
                token,
                handle: None,
            };
        }

        let client = self.clone();
        let task_key = key.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let wake = client.waker(&task_key);
            debug!(key = %task_key, "Query mounted");

            loop {
                let cycle = client.fetch_cycle(&task_key, &retry, &mut fetcher);
                tokio::select! {
                    _ = task_token.cancelled() => {
                        client.abort_fetch(&task_key);
                        break;
                    }
                    _ = cycle => {}
                }

                let wait = async {
                    match refetch_interval {
                        Some(interval) => {
                            tokio::select! {
                                _ = tokio::time::sleep(interval) => {}
                                _ = wake.notified() => {}
                            }
                        }
                        None => wake.notified().await,
                    }
                };
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = wait => {}
                }
            }

            debug!(key = %task_key, "Query unmounted");
        });

        MountedQuery {
            key,
            token,
            handle: Some(handle),
        }
    }

    /// Run a write. On success every key in `invalidates` is marked stale
    /// and its mounted query woken; on failure the error is returned
    /// unchanged and nothing is invalidated.
    pub async fn run_mutation<T, E, F, Fut>(
        &self,
        name: &str,
        invalidates: &[&str],
        op: F,
    ) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!(mutation = %name, "Running mutation");
        match op().await {
            Ok(value) => {
                for key in invalidates {
                    self.invalidate(key);
                }
                Ok(value)
            }
            Err(e) => {
                warn!(mutation = %name, error = %e, "Mutation failed");
                Err(e)
            }
        }
    }

    /// Mark `key` stale and wake its mounted query, if any. With no mount,
    /// the next use of the key re-fetches before serving. A fetch in flight
    /// when the invalidation lands commits as superseded.
    pub fn invalidate(&self, key: &str) {
        {
            let mut entry = self.inner.entries.entry(key.to_string()).or_default();
            entry.stale = true;
            // An in-flight fetch predates this invalidation; its commit must
            // not clear the stale mark with pre-invalidation data.
            entry.generation += 1;
        }
        self.inner.stats.record_invalidation();
        debug!(key = %key, "Cache entry invalidated");

        if let Some(wake) = self.inner.wakers.get(key) {
            wake.notify_one();
        }
        self.emit(key, CacheEventKind::Invalidated);
    }

    /// Receive change notifications for every key.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Tear down every entry, e.g. on logout. Mounted queries survive and
    /// repopulate their keys on their next cycle.
    pub fn clear(&self) {
        let count = self.inner.entries.len();
        self.inner.entries.clear();
        debug!(cleared_entries = count, "Query cache cleared");
        self.emit("*", CacheEventKind::Cleared);
    }

    /// Cache statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.entries.len())
    }

    // ------------------------------------------------------------------
    // Fetch bookkeeping
    // ------------------------------------------------------------------

    /// Start a fetch: advance the key's generation and return it.
    fn begin_fetch(&self, key: &str) -> u64 {
        let mut entry = self.inner.entries.entry(key.to_string()).or_default();
        entry.generation += 1;
        entry.in_flight = true;
        entry.generation
    }

    /// Commit a fetch outcome if `generation` is still current. Returns
    /// whether the outcome was committed.
    fn commit_fetch(
        &self,
        key: &str,
        generation: u64,
        outcome: Result<serde_json::Value, String>,
    ) -> bool {
        let mut entry = match self.inner.entries.get_mut(key) {
            Some(entry) => entry,
            None => {
                // Cleared while in flight; nothing to update.
                self.inner.stats.record_discard();
                return false;
            }
        };
        if entry.generation != generation {
            drop(entry);
            self.inner.stats.record_discard();
            debug!(key = %key, generation, "Superseded fetch result discarded");
            return false;
        }

        entry.in_flight = false;
        match outcome {
            Ok(value) => {
                entry.data = Some(value);
                entry.error = None;
                entry.stale = false;
                drop(entry);
                self.inner.stats.record_write();
                self.emit(key, CacheEventKind::Updated);
            }
            Err(message) => {
                entry.error = Some(message);
                drop(entry);
                self.inner.stats.record_failure();
                self.emit(key, CacheEventKind::Failed);
            }
        }
        true
    }

    /// One full fetch: begin, run with retry, commit under the generation
    /// rule. The caller gets the fetch result either way.
    async fn fetch_cycle<T, E, F, Fut>(
        &self,
        key: &str,
        policy: &RetryPolicy,
        fetcher: &mut F,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: FetchError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = self.begin_fetch(key);
        let result = with_retry(policy, |e: &E| e.is_retryable(), fetcher).await;

        match result {
            Ok(value) => {
                let outcome = match serde_json::to_value(&value) {
                    Ok(json) => Ok(json),
                    Err(e) => Err(format!("result encode failed: {}", e)),
                };
                self.commit_fetch(key, generation, outcome);
                Ok(value)
            }
            Err(e) => {
                self.commit_fetch(key, generation, Err(e.to_string()));
                Err(e)
            }
        }
    }

    /// Clear the in-flight flag after a cancelled cycle.
    fn abort_fetch(&self, key: &str) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.in_flight = false;
        }
    }

    fn waker(&self, key: &str) -> Arc<Notify> {
        self.inner
            .wakers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .value()
            .clone()
    }

    fn emit(&self, key: &str, kind: CacheEventKind) {
        let _ = self.inner.events.send(CacheEvent {
            key: key.to_string(),
            kind,
        });
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MOUNTED QUERY GUARD
// ============================================================================

/// Handle to a mounted query. Dropping it cancels the background refresh
/// task; the cached entry itself stays behind.
pub struct MountedQuery {
    key: String,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MountedQuery {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the refresh task is still running. Disabled mounts are
    /// never active.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for MountedQuery {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ============================================================================
// TESTS
// ============================================================================
