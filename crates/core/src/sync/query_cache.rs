//! Keyed, TTL-aware store of server state
//!
//! One [`QueryCache`] is created per signed-in session and cleared on
//! sign-out. Entries are indexed by [`QueryKey`]; each holds the last value
//! the server returned, any optimistic layers stacked on top of it, and at
//! most one in-flight fetch.
//!
//! ## Entry lifecycle
//!
//! ```text
//! (absent) --get--> fetching --ok--> fresh --ttl--> stale --get--> fetching
//!                       \                                             |
//!                        `--err--> error (last data kept) <--err------'
//! ```
//!
//! `invalidate` and `invalidate_prefix` move an entry straight to stale and
//! bump its epoch. A fetch that was started under an older epoch still lands
//! (completions are applied in the order they finish) but leaves the entry
//! stale, and any `get` issued after the invalidation waits for it and then
//! fetches again.
//!
//! ## Notifications
//!
//! Listeners are registered per key with [`QueryCache::subscribe`]. Every
//! visible change bumps the entry's `version`, then the listener list is
//! copied and called after the lock is released. A listener may call back
//! into the cache; one added during a pass is first called on the next one.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use afasa_common::time::{Clock, SystemClock};
use afasa_domain::{ApiError, QueryKey, QueryStatus};
use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Future returned by a [`Fetcher`]
pub type FetchFuture = BoxFuture<'static, Result<Value, ApiError>>;

/// Produces the server value for one key; kept so the key can be refreshed
pub type Fetcher = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Callback invoked with a snapshot after each visible change
pub type Listener = Arc<dyn Fn(&QuerySnapshot) + Send + Sync>;

/// Optimistic transform of a cached value
///
/// Receives the key being patched so one patch can treat list and filtered
/// list entries differently.
pub type Patch = Arc<dyn Fn(&QueryKey, &Value) -> Value + Send + Sync>;

type FetchDone = Shared<BoxFuture<'static, ()>>;
type Delivery = (QuerySnapshot, Vec<Listener>);

/// Wrap an async closure as a [`Fetcher`]
pub fn fetcher_fn<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Point-in-time view of a cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub key: QueryKey,
    /// Server value with optimistic layers applied
    pub data: Option<Value>,
    pub status: QueryStatus,
    /// Last fetch error; `data` still holds the last good value
    pub error: Option<ApiError>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Increases on every visible change to the entry
    pub version: u64,
}

impl QuerySnapshot {
    fn empty(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Stale,
            error: None,
            fetched_at: None,
            version: 0,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Fresh
    }

    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Empty,
    Loaded,
    Invalidated,
    Failed,
}

struct InFlight {
    id: u64,
    epoch: u64,
    done: FetchDone,
}

struct Layer {
    id: Uuid,
    patch: Patch,
    /// Epoch at which the owning mutation succeeded; the layer is dropped
    /// once a fetch started at or after this epoch lands.
    committed_at: Option<u64>,
}

struct Entry {
    server_data: Option<Value>,
    layers: Vec<Layer>,
    fetched_at: Option<(Instant, DateTime<Utc>)>,
    ttl: Duration,
    outcome: Outcome,
    error: Option<ApiError>,
    in_flight: Option<InFlight>,
    epoch: u64,
    fetcher: Option<Fetcher>,
    version: u64,
}

impl Entry {
    fn new(ttl: Duration) -> Self {
        Self {
            server_data: None,
            layers: Vec::new(),
            fetched_at: None,
            ttl,
            outcome: Outcome::Empty,
            error: None,
            in_flight: None,
            epoch: 0,
            fetcher: None,
            version: 0,
        }
    }

    fn status(&self, now: Instant) -> QueryStatus {
        if self.in_flight.is_some() {
            return QueryStatus::Fetching;
        }
        match self.outcome {
            Outcome::Failed => QueryStatus::Error,
            Outcome::Empty | Outcome::Invalidated => QueryStatus::Stale,
            Outcome::Loaded => match self.fetched_at {
                Some((at, _)) if now.saturating_duration_since(at) < self.ttl => QueryStatus::Fresh,
                _ => QueryStatus::Stale,
            },
        }
    }

    fn visible_data(&self, key: &QueryKey) -> Option<Value> {
        let base = self.server_data.as_ref()?;
        Some(self.layers.iter().fold(base.clone(), |acc, layer| (layer.patch)(key, &acc)))
    }

    fn snapshot(&self, key: &QueryKey, now: Instant) -> QuerySnapshot {
        QuerySnapshot {
            key: key.clone(),
            data: self.visible_data(key),
            status: self.status(now),
            error: self.error.clone(),
            fetched_at: self.fetched_at.map(|(_, at)| at),
            version: self.version,
        }
    }

    fn invalidate(&mut self) {
        self.epoch += 1;
        if self.outcome != Outcome::Empty {
            self.outcome = Outcome::Invalidated;
        }
        self.version += 1;
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    listeners: HashMap<QueryKey, Vec<(u64, Listener)>>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn listeners_for(listeners: &HashMap<QueryKey, Vec<(u64, Listener)>>, key: &QueryKey) -> Vec<Listener> {
    listeners
        .get(key)
        .map(|registered| registered.iter().map(|(_, listener)| Arc::clone(listener)).collect())
        .unwrap_or_default()
}

fn deliver(batch: Vec<Delivery>) {
    for (snapshot, listeners) in batch {
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

struct Inner {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl Inner {
    fn remove_listener(&self, key: &QueryKey, id: u64) {
        let mut state = self.state.lock();
        let now_empty = state.listeners.get_mut(key).is_some_and(|registered| {
            registered.retain(|(listener_id, _)| *listener_id != id);
            registered.is_empty()
        });
        if now_empty {
            state.listeners.remove(key);
        }
    }
}

/// Session-scoped cache of server state
///
/// Cloning is cheap and every clone shares the same entries.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use afasa_core::sync::{fetcher_fn, QueryCache};
/// use afasa_domain::query_key;
///
/// # async fn demo() {
/// let cache = QueryCache::new(Duration::from_secs(30));
/// let key = query_key!["tasks", "open"];
/// let _subscription = cache.subscribe(&key, |snapshot| println!("{:?}", snapshot.data));
/// let fetch = fetcher_fn(|| async { Ok(serde_json::json!([])) });
/// let snapshot = cache.get(&key, fetch, Duration::from_secs(30)).await;
/// assert!(snapshot.data.is_some());
/// # }
/// ```
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner { state: Mutex::new(State::default()), clock, default_ttl }),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Read a key, fetching it if the entry is absent, stale or failed
    ///
    /// A fresh entry is returned without touching the network. If a fetch is
    /// already running for the key the caller waits for it instead of
    /// starting another. Never fails: fetch errors are reported through the
    /// snapshot's `status` and `error`.
    #[instrument(level = "debug", skip_all, fields(key = %key))]
    pub async fn get(&self, key: &QueryKey, fetcher: Fetcher, ttl: Duration) -> QuerySnapshot {
        self.resolve(key, Some((fetcher, ttl)), false)
            .await
            .unwrap_or_else(|| QuerySnapshot::empty(key.clone()))
    }

    /// Re-run the last fetcher registered for `key`, even if the entry is
    /// fresh. Joins a fetch that is already running. Returns `None` for an
    /// unknown key.
    #[instrument(level = "debug", skip_all, fields(key = %key))]
    pub async fn refresh(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.resolve(key, None, true).await
    }

    /// Current view of `key` without fetching
    pub fn peek(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let state = self.inner.state.lock();
        let now = self.inner.clock.now();
        state.entries.get(key).map(|entry| entry.snapshot(key, now))
    }

    /// Register `listener` for changes to `key`
    ///
    /// The listener stays registered until the returned handle is dropped or
    /// [`Subscription::unsubscribe`] is called. Subscribing does not fetch.
    pub fn subscribe<F>(&self, key: &QueryKey, listener: F) -> Subscription
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = state.next_id();
        state.listeners.entry(key.clone()).or_default().push((id, Arc::new(listener)));
        debug!(key = %key, subscription = id, "subscribed");
        Subscription { cache: Arc::downgrade(&self.inner), key: key.clone(), id }
    }

    /// Mark `key` stale. Returns `false` if there is no entry for it.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let delivery = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            let Some(entry) = state.entries.get_mut(key) else {
                return false;
            };
            entry.invalidate();
            (entry.snapshot(key, now), listeners_for(&state.listeners, key))
        };
        debug!(key = %key, "invalidated");
        deliver(vec![delivery]);
        true
    }

    /// Mark every entry whose key starts with `prefix` stale
    ///
    /// Returns the number of entries invalidated.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let batch: Vec<Delivery> = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            state
                .entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, entry)| {
                    entry.invalidate();
                    (entry.snapshot(key, now), listeners_for(&state.listeners, key))
                })
                .collect()
        };
        let count = batch.len();
        info!(prefix = %prefix, count, "invalidated by prefix");
        deliver(batch);
        count
    }

    /// Store a server-confirmed value for `key` as fresh
    ///
    /// Layers of committed mutations are dropped, since the value already
    /// reflects them. Layers of mutations still pending stay on top.
    pub fn set_query_data(&self, key: &QueryKey, data: Value) {
        let delivery = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            let entry =
                state.entries.entry(key.clone()).or_insert_with(|| Entry::new(self.inner.default_ttl));
            entry.server_data = Some(data);
            entry.fetched_at = Some((now, self.inner.clock.utc_now()));
            entry.outcome = Outcome::Loaded;
            entry.error = None;
            entry.layers.retain(|layer| layer.committed_at.is_none());
            entry.version += 1;
            (entry.snapshot(key, now), listeners_for(&state.listeners, key))
        };
        deliver(vec![delivery]);
    }

    /// Drop every entry. Results of fetches still running are discarded.
    ///
    /// Listeners stay registered; they are owned by their [`Subscription`].
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.inner.state.lock();
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };
        info!(removed, "query cache cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stack an optimistic layer on every entry under `targets` that has data
    ///
    /// Returns the keys that received the layer.
    pub(crate) fn apply_layer(&self, id: Uuid, targets: &[QueryKey], patch: &Patch) -> Vec<QueryKey> {
        let batch: Vec<Delivery> = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            state
                .entries
                .iter_mut()
                .filter(|(key, entry)| {
                    entry.server_data.is_some() && targets.iter().any(|target| key.starts_with(target))
                })
                .map(|(key, entry)| {
                    entry.layers.push(Layer { id, patch: Arc::clone(patch), committed_at: None });
                    entry.version += 1;
                    (entry.snapshot(key, now), listeners_for(&state.listeners, key))
                })
                .collect()
        };
        let affected = batch.iter().map(|(snapshot, _)| snapshot.key.clone()).collect();
        deliver(batch);
        affected
    }

    /// Remove the layer `id` from every entry. Returns the number of entries
    /// that changed.
    pub(crate) fn rollback_layer(&self, id: Uuid) -> usize {
        let batch: Vec<Delivery> = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            state
                .entries
                .iter_mut()
                .filter(|(_, entry)| entry.layers.iter().any(|layer| layer.id == id))
                .map(|(key, entry)| {
                    entry.layers.retain(|layer| layer.id != id);
                    entry.version += 1;
                    (entry.snapshot(key, now), listeners_for(&state.listeners, key))
                })
                .collect()
        };
        let count = batch.len();
        deliver(batch);
        count
    }

    /// Confirm mutation `id` and invalidate every entry under `targets`
    ///
    /// Both happen under one lock acquisition. The layer is stamped with the
    /// epoch the invalidation moves its entry to, so it stays visible until a
    /// fetch started after this point lands and no fetch can observe it
    /// unconfirmed in between. Returns the number of entries invalidated.
    pub(crate) fn commit_layer(&self, id: Uuid, targets: &[QueryKey]) -> usize {
        let batch: Vec<Delivery> = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.clock.now();
            state
                .entries
                .iter_mut()
                .filter_map(|(key, entry)| {
                    let targeted = targets.iter().any(|target| key.starts_with(target));
                    if targeted {
                        entry.invalidate();
                    }
                    let epoch = entry.epoch;
                    for layer in entry.layers.iter_mut().filter(|layer| layer.id == id) {
                        layer.committed_at = Some(epoch);
                    }
                    targeted.then(|| (entry.snapshot(key, now), listeners_for(&state.listeners, key)))
                })
                .collect()
        };
        let count = batch.len();
        debug!(mutation = %id, count, "layer committed; targets invalidated");
        deliver(batch);
        count
    }

    async fn resolve(
        &self,
        key: &QueryKey,
        source: Option<(Fetcher, Duration)>,
        force: bool,
    ) -> Option<QuerySnapshot> {
        loop {
            let (done, superseded) = {
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;
                let now = self.inner.clock.now();
                let fetch_id = state.next_id();
                let entry = match &source {
                    Some((fetcher, ttl)) => {
                        let entry =
                            state.entries.entry(key.clone()).or_insert_with(|| Entry::new(*ttl));
                        entry.fetcher = Some(Arc::clone(fetcher));
                        entry.ttl = *ttl;
                        entry
                    }
                    None => state.entries.get_mut(key)?,
                };

                let joined = entry
                    .in_flight
                    .as_ref()
                    .map(|flight| (flight.done.clone(), flight.epoch != entry.epoch));
                if let Some((done, superseded)) = joined {
                    debug!(key = %key, superseded, "joining in-flight fetch");
                    (done, superseded)
                } else if !force && entry.status(now) == QueryStatus::Fresh {
                    return Some(entry.snapshot(key, now));
                } else if let Some(fetcher) = entry.fetcher.clone() {
                    (self.start_fetch(key, entry, fetch_id, fetcher), false)
                } else {
                    return Some(entry.snapshot(key, now));
                }
            };

            done.await;
            if !superseded {
                return self.peek(key);
            }
        }
    }

    fn start_fetch(&self, key: &QueryKey, entry: &mut Entry, id: u64, fetcher: Fetcher) -> FetchDone {
        let (tx, rx) = oneshot::channel::<()>();
        let done: FetchDone = rx.map(|_| ()).boxed().shared();
        entry.in_flight = Some(InFlight { id, epoch: entry.epoch, done: done.clone() });
        debug!(key = %key, fetch_id = id, epoch = entry.epoch, "starting fetch");

        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let result = AssertUnwindSafe(async move { fetcher().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ApiError::InvalidResponse("fetcher panicked".to_string())));
            cache.finish_fetch(&key, id, result);
            let _ = tx.send(());
        });
        done
    }

    fn finish_fetch(&self, key: &QueryKey, id: u64, result: Result<Value, ApiError>) {
        let delivery = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let Some(entry) = state.entries.get_mut(key) else {
                debug!(key = %key, fetch_id = id, "fetch landed after clear; discarded");
                return;
            };
            let Some(flight_epoch) =
                entry.in_flight.as_ref().filter(|flight| flight.id == id).map(|flight| flight.epoch)
            else {
                return;
            };
            entry.in_flight = None;

            let superseded = flight_epoch != entry.epoch;
            let now = self.inner.clock.now();
            match result {
                Ok(data) => {
                    entry.server_data = Some(data);
                    entry.fetched_at = Some((now, self.inner.clock.utc_now()));
                    entry.error = None;
                    entry.outcome = if superseded { Outcome::Invalidated } else { Outcome::Loaded };
                    entry
                        .layers
                        .retain(|layer| layer.committed_at.is_none_or(|at| at > flight_epoch));
                    debug!(key = %key, fetch_id = id, superseded, "fetch complete");
                }
                Err(error) => {
                    warn!(key = %key, fetch_id = id, error = %error, "fetch failed");
                    entry.error = Some(error);
                    entry.outcome = Outcome::Failed;
                }
            }
            entry.version += 1;
            (entry.snapshot(key, now), listeners_for(&state.listeners, key))
        };
        deliver(vec![delivery]);
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("default_ttl", &self.inner.default_ttl)
            .finish()
    }
}

/// Handle returned by [`QueryCache::subscribe`]
///
/// Dropping it removes the listener. A fetch the subscriber triggered keeps
/// running and still updates the shared entry.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cache: Weak<Inner>,
    key: QueryKey,
    id: u64,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.cache.upgrade() {
            inner.remove_listener(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).field("id", &self.id).finish()
    }
}
