//! Keyed query cache with a freshness window, stale-while-revalidate reads and
//! one in-flight fetch per key.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use tokio::{sync::Mutex, task::AbortHandle, time::Instant};
use tracing::{debug, warn};

use crate::{
    config::ClientSettings,
    error::{ClientError, Result},
};

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RETRY: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Cache key. Parameterized queries get their own variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Menus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Duration,
    pub retry: u32,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            retry: DEFAULT_RETRY,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl QueryOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            stale_time: settings.stale_time(),
            retry: settings.query_retry,
            ..Self::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY)
    }
}

pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A key plus the function that loads its data.
pub struct Query<T> {
    pub key: QueryKey,
    pub options: QueryOptions,
    query_fn: QueryFn<T>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            options: self.options,
            query_fn: Arc::clone(&self.query_fn),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Query<T> {
    pub fn new<F, Fut>(key: QueryKey, options: QueryOptions, query_fn: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            key,
            options,
            query_fn: Arc::new(move || query_fn().boxed()),
        }
    }

    async fn run(&self) -> Result<T> {
        let mut attempt = 0;
        loop {
            match (self.query_fn)().await {
                Ok(data) => return Ok(data),
                Err(err @ (ClientError::Validation(_) | ClientError::Config(_))) => {
                    return Err(err)
                }
                Err(err) if attempt < self.options.retry => {
                    let delay = self.options.backoff(attempt);
                    warn!(key = ?self.key, attempt, ?delay, error = %err, "query failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    /// The last fetch failed. Data from an earlier success is kept.
    Error {
        message: String,
        stale_data: Option<Arc<T>>,
    },
    Ready {
        data: Arc<T>,
        is_stale: bool,
        is_fetching: bool,
    },
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Ready { data, .. } => Some(data),
            Self::Error { stale_data, .. } => stale_data.as_ref(),
            Self::Loading => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

struct InFlight<T> {
    id: u64,
    future: SharedFetch<T>,
    abort: AbortHandle,
}

struct Entry<T> {
    data: Option<Arc<T>>,
    updated_at: Option<Instant>,
    error: Option<String>,
    attempted: bool,
    /// Bumped by every invalidation.
    generation: u64,
    /// Generation at which the fetch that produced `data` started.
    data_generation: u64,
    in_flight: Option<InFlight<T>>,
    query: Option<Query<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            updated_at: None,
            error: None,
            attempted: false,
            generation: 0,
            data_generation: 0,
            in_flight: None,
            query: None,
        }
    }
}

impl<T> Entry<T> {
    fn stale_time(&self) -> Duration {
        self.query
            .as_ref()
            .map(|q| q.options.stale_time)
            .unwrap_or(DEFAULT_STALE_TIME)
    }

    fn is_stale(&self, now: Instant) -> bool {
        match (&self.data, self.updated_at) {
            (Some(_), Some(updated_at)) => {
                self.generation != self.data_generation
                    || now.duration_since(updated_at) >= self.stale_time()
            }
            _ => true,
        }
    }

    fn active_fetch(&self) -> Option<&InFlight<T>> {
        self.in_flight
            .as_ref()
            .filter(|in_flight| !in_flight.abort.is_finished())
    }

    fn snapshot(&self, now: Instant) -> QueryState<T> {
        if let Some(message) = &self.error {
            return QueryState::Error {
                message: message.clone(),
                stale_data: self.data.clone(),
            };
        }
        match &self.data {
            Some(data) => QueryState::Ready {
                data: Arc::clone(data),
                is_stale: self.is_stale(now),
                is_fetching: self.active_fetch().is_some(),
            },
            None => QueryState::Loading,
        }
    }
}

struct Inner<T> {
    entries: Mutex<HashMap<QueryKey, Entry<T>>>,
    next_fetch_id: AtomicU64,
}

impl<T: Send + Sync + 'static> Inner<T> {
    /// Joins the active fetch for the entry or spawns a new one.
    fn start_fetch(self: &Arc<Self>, entry: &mut Entry<T>, query: Query<T>) -> SharedFetch<T> {
        if let Some(in_flight) = entry.active_fetch() {
            debug!(key = ?query.key, "joining in-flight fetch");
            return in_flight.future.clone();
        }

        let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let generation = entry.generation;
        let key = query.key;
        entry.attempted = true;
        // Without data to fall back on, a new attempt reads as loading again.
        if entry.data.is_none() {
            entry.error = None;
        }
        debug!(?key, fetch_id = id, "starting fetch");

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = query.run().await;
            inner.complete(key, id, generation, outcome).await
        });
        let abort = task.abort_handle();
        let future = async move {
            match task.await {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(ClientError::Cancelled),
                Err(err) => Err(ClientError::Fetch(format!("query task failed: {err}"))),
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            id,
            future: future.clone(),
            abort,
        });
        future
    }

    async fn complete(
        self: &Arc<Self>,
        key: QueryKey,
        fetch_id: u64,
        generation: u64,
        outcome: Result<T>,
    ) -> Result<Arc<T>> {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key).or_default();
        if entry.in_flight.as_ref().map(|f| f.id) == Some(fetch_id) {
            entry.in_flight = None;
        }

        let result = match outcome {
            Ok(data) => {
                let data = Arc::new(data);
                entry.data = Some(Arc::clone(&data));
                entry.updated_at = Some(Instant::now());
                entry.data_generation = generation;
                entry.error = None;
                debug!(?key, fetch_id, "fetch completed");
                Ok(data)
            }
            Err(err) => {
                warn!(?key, fetch_id, error = %err, "fetch failed");
                entry.error = Some(err.to_string());
                Err(err)
            }
        };

        // Invalidated while this fetch was running: its data is already
        // outdated, so go again.
        if entry.generation != generation {
            if let Some(query) = entry.query.clone() {
                drop(self.start_fetch(entry, query));
            }
        }

        result
    }
}

/// Cloning yields another handle onto the same cache.
pub struct QueryClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for QueryClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Default for QueryClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> QueryClient<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_fetch_id: AtomicU64::new(1),
            }),
        }
    }

    pub async fn state(&self, key: QueryKey) -> QueryState<T> {
        let entries = self.inner.entries.lock().await;
        entries
            .get(&key)
            .map(|entry| entry.snapshot(Instant::now()))
            .unwrap_or(QueryState::Loading)
    }

    /// Non-blocking read. Starts a background fetch when nothing has been
    /// loaded yet or the cached data is stale, and keeps serving the stale data
    /// until the new result lands.
    pub async fn observe(&self, query: &Query<T>) -> QueryState<T> {
        let mut entries = self.inner.entries.lock().await;
        let entry = entries.entry(query.key).or_default();
        entry.query = Some(query.clone());

        let now = Instant::now();
        let needs_fetch = entry.active_fetch().is_none()
            && match entry.data {
                Some(_) => entry.is_stale(now),
                None => !entry.attempted,
            };
        if needs_fetch {
            drop(self.inner.start_fetch(entry, query.clone()));
        }
        entry.snapshot(now)
    }

    /// Awaiting read. Fresh data comes straight from the cache; anything else
    /// waits on the (possibly shared) fetch.
    pub async fn fetch(&self, query: &Query<T>) -> Result<Arc<T>> {
        let pending = {
            let mut entries = self.inner.entries.lock().await;
            let entry = entries.entry(query.key).or_default();
            entry.query = Some(query.clone());

            match &entry.data {
                Some(data) if entry.error.is_none() && !entry.is_stale(Instant::now()) => {
                    debug!(key = ?query.key, "serving fresh data from cache");
                    return Ok(Arc::clone(data));
                }
                _ => self.inner.start_fetch(entry, query.clone()),
            }
        };
        pending.await
    }

    /// Fetches regardless of freshness, joining an in-flight fetch if any.
    pub async fn refetch(&self, query: &Query<T>) -> Result<Arc<T>> {
        let pending = {
            let mut entries = self.inner.entries.lock().await;
            let entry = entries.entry(query.key).or_default();
            entry.query = Some(query.clone());
            self.inner.start_fetch(entry, query.clone())
        };
        pending.await
    }

    /// Marks the cached data stale and refetches in the background when a
    /// query is registered for the key.
    pub async fn invalidate(&self, key: QueryKey) {
        let mut entries = self.inner.entries.lock().await;
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        entry.generation += 1;
        debug!(?key, generation = entry.generation, "invalidated query");

        if entry.active_fetch().is_some() {
            return;
        }
        if let Some(query) = entry.query.clone() {
            drop(self.inner.start_fetch(entry, query));
        }
    }

    /// Aborts the in-flight fetch for `key`. Cached data is kept; an entry
    /// that never loaded goes back to its unfetched state so the next
    /// `observe` starts over.
    pub async fn cancel(&self, key: QueryKey) {
        let mut entries = self.inner.entries.lock().await;
        let Some(entry) = entries.get_mut(&key) else {
            return;
        };
        if let Some(in_flight) = entry.in_flight.take() {
            debug!(?key, fetch_id = in_flight.id, "cancelling fetch");
            in_flight.abort.abort();
            if entry.data.is_none() {
                entry.attempted = false;
            }
        }
    }

    /// Waits for the in-flight fetch (if any) and returns the resulting state.
    pub async fn settle(&self, key: QueryKey) -> QueryState<T> {
        loop {
            let pending = {
                let entries = self.inner.entries.lock().await;
                entries
                    .get(&key)
                    .and_then(|entry| entry.active_fetch())
                    .map(|in_flight| in_flight.future.clone())
            };
            match pending {
                Some(future) => {
                    let _ = future.await;
                }
                None => return self.state(key).await,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
