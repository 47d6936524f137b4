// In-memory query cache
//
// Entries are keyed by endpoint + serialized arguments, reference counted
// by their subscribers and indexed by the tags they provide. Writes call
// `invalidate` with the tags they touch; matching entries go stale and the
// ones somebody is still looking at refetch in the background.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{error::FetchError, key::QueryKey, tag::Tag};

pub type FetchResult = Result<Value, FetchError>;

/// Produces a fresh request future each time the entry needs data
pub type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

type InFlight = Shared<BoxFuture<'static, FetchResult>>;

/// Lifecycle of a cache entry
///
/// `Uninitialized → Loading → Success ⇄ Refetching`, or
/// `Loading → Error`. Leaving `Error` takes an explicit refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Loading,
    Success,
    Refetching,
    Error,
}

/// Point-in-time view of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<FetchError>,
    pub stale: bool,
    pub subscribers: usize,
}

impl QuerySnapshot {
    fn uninitialized() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            stale: false,
            subscribers: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long an entry with no subscribers survives before eviction
    pub keep_unused_for: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(60),
        }
    }
}

struct Entry {
    status: QueryStatus,
    data: Option<Value>,
    error: Option<FetchError>,
    provides: Vec<Tag>,
    subscribers: usize,
    stale: bool,
    fetch: FetchFn,
    in_flight: Option<InFlight>,
    generation: u64,
    /// Generation that was current when the entry was last invalidated
    invalidated_at: u64,
    unused_since: Option<Instant>,
}

impl Entry {
    fn new(provides: Vec<Tag>, fetch: FetchFn) -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            provides,
            subscribers: 0,
            stale: false,
            fetch,
            in_flight: None,
            generation: 0,
            invalidated_at: 0,
            unused_since: None,
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            stale: self.stale,
            subscribers: self.subscribers,
        }
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    /// tag → keys of entries currently providing it
    tags: HashMap<Tag, HashSet<QueryKey>>,
}

impl State {
    fn index(&mut self, key: &QueryKey, provides: &[Tag]) {
        for tag in provides {
            self.tags.entry(tag.clone()).or_default().insert(key.clone());
        }
    }

    fn unindex(&mut self, key: &QueryKey, provides: &[Tag]) {
        for tag in provides {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }

    fn matching(&self, invalidated: &Tag) -> impl Iterator<Item = &QueryKey> + '_ {
        let invalidated = invalidated.clone();
        self.tags
            .iter()
            .filter(move |(provided, _)| invalidated.invalidates(provided))
            .flat_map(|(_, keys)| keys.iter())
    }

    fn evict(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.unindex(key, &entry.provides);
            debug!("Evicted {}", key);
        }
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared, cloneable handle to the cache
///
/// Fetches are spawned onto the ambient Tokio runtime, so every method
/// that can start one must be called from within a runtime.
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<State>>,
    options: CacheOptions,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_options(CacheOptions::default())
    }

    pub fn with_options(options: CacheOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            options,
        }
    }

    /// Register interest in a query
    ///
    /// The first subscriber creates the entry and starts the fetch. Later
    /// subscribers join whatever is in flight, reuse fresh data, or kick
    /// off the lazy refetch of an entry that went stale while unobserved.
    pub fn subscribe(&self, key: QueryKey, provides: Vec<Tag>, fetch: FetchFn) -> Subscription {
        let mut state = lock(&self.state);
        self.collect_garbage(&mut state);

        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(provides, fetch));
        entry.subscribers += 1;
        entry.unused_since = None;

        let needs_fetch = match entry.status {
            QueryStatus::Uninitialized => true,
            QueryStatus::Error => false,
            _ => entry.stale && entry.in_flight.is_none(),
        };

        if needs_fetch {
            start_fetch(&self.state, &mut state, &key);
        } else {
            debug!("Subscribed to {} without a new request", key);
        }
        drop(state);

        Subscription {
            cache: self.clone(),
            key,
        }
    }

    /// Mark everything providing one of `tags` stale
    ///
    /// Entries with subscribers refetch in the background; the rest only
    /// get the stale flag and refetch when someone subscribes again.
    /// Returns the keys that were refetched.
    pub fn invalidate(&self, tags: &[Tag]) -> Vec<QueryKey> {
        let mut state = lock(&self.state);
        self.collect_garbage(&mut state);

        let keys: BTreeSet<QueryKey> = tags
            .iter()
            .flat_map(|tag| state.matching(tag).cloned().collect::<Vec<_>>())
            .collect();

        let mut refetched = Vec::new();
        for key in keys {
            let active = match state.entries.get_mut(&key) {
                Some(entry) => {
                    entry.stale = true;
                    entry.invalidated_at = entry.generation;
                    entry.subscribers > 0
                }
                None => continue,
            };

            if active {
                start_fetch(&self.state, &mut state, &key);
                refetched.push(key);
            } else {
                debug!("{} is stale with no subscribers, deferring refetch", key);
            }
        }

        if !tags.is_empty() {
            let names: Vec<String> = tags.iter().map(ToString::to_string).collect();
            info!(
                "Invalidated [{}], refetching {} queries",
                names.join(", "),
                refetched.len()
            );
        }

        refetched
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        lock(&self.state).entries.get(key).map(Entry::snapshot)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        lock(&self.state).entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until nothing is in flight
    ///
    /// Each fetch is awaited at most once, so a fetch whose task died
    /// without clearing its slot cannot keep this looping.
    pub async fn settle(&self) {
        let mut awaited: HashSet<(QueryKey, u64)> = HashSet::new();
        loop {
            let pending: Vec<((QueryKey, u64), InFlight)> = lock(&self.state)
                .entries
                .iter()
                .filter_map(|(k, e)| {
                    let in_flight = e.in_flight.clone()?;
                    Some(((k.clone(), e.generation), in_flight))
                })
                .filter(|(id, _)| !awaited.contains(id))
                .collect();
            if pending.is_empty() {
                return;
            }
            let (ids, futures): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
            awaited.extend(ids);
            join_all(futures).await;
        }
    }

    fn release(&self, key: &QueryKey) {
        let mut state = lock(&self.state);
        let evict_now = match state.entries.get_mut(key) {
            Some(entry) => {
                entry.subscribers = entry.subscribers.saturating_sub(1);
                if entry.subscribers == 0 {
                    entry.unused_since = Some(Instant::now());
                    self.options.keep_unused_for.is_zero()
                } else {
                    false
                }
            }
            None => false,
        };

        if evict_now {
            state.evict(key);
        }
    }

    fn collect_garbage(&self, state: &mut State) {
        let keep = self.options.keep_unused_for;
        let expired: Vec<QueryKey> = state
            .entries
            .iter()
            .filter(|(_, e)| {
                e.subscribers == 0 && e.unused_since.is_some_and(|since| since.elapsed() >= keep)
            })
            .map(|(k, _)| k.clone())
            .collect();

        for key in expired {
            state.evict(&key);
        }
    }

    fn refetch(&self, key: &QueryKey) {
        let mut state = lock(&self.state);
        let idle = state
            .entries
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_none());
        if idle {
            start_fetch(&self.state, &mut state, key);
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn start_fetch(shared: &Arc<Mutex<State>>, state: &mut State, key: &QueryKey) {
    let Some(entry) = state.entries.get_mut(key) else {
        return;
    };

    entry.generation += 1;
    entry.status = match entry.status {
        QueryStatus::Success | QueryStatus::Refetching => QueryStatus::Refetching,
        _ => QueryStatus::Loading,
    };

    let generation = entry.generation;
    let request = (entry.fetch)();
    let provides = entry.provides.clone();
    let mut guard = CompletionGuard {
        state: Arc::downgrade(shared),
        key: key.clone(),
        generation,
        finished: false,
    };

    // Reachable through its tags for as long as a fetch is pending
    state.index(key, &provides);

    debug!("Fetching {} (generation {})", key, generation);

    // Runs to completion even if every subscriber goes away.
    let handle = tokio::spawn(async move {
        let result = request.await;
        guard.finish(&result);
        result
    });

    let in_flight = async move {
        handle
            .await
            .unwrap_or_else(|e| Err(FetchError::new(None, format!("fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    if let Some(entry) = state.entries.get_mut(key) {
        entry.in_flight = Some(in_flight);
    }
}

/// Settles the entry for one fetch, also when the task panics or is
/// cancelled before producing a result
struct CompletionGuard {
    state: Weak<Mutex<State>>,
    key: QueryKey,
    generation: u64,
    finished: bool,
}

impl CompletionGuard {
    fn finish(&mut self, result: &FetchResult) {
        self.finished = true;
        if let Some(state) = self.state.upgrade() {
            complete(&state, &self.key, self.generation, result);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Fetch for {} ended without a result", self.key);
            self.finish(&Err(FetchError::new(None, "fetch task ended without a result")));
        }
    }
}

fn complete(shared: &Arc<Mutex<State>>, key: &QueryKey, generation: u64, result: &FetchResult) {
    let mut state = lock(shared);

    let (provides, refetch) = match state.entries.get_mut(key) {
        None => {
            debug!("Dropping result for evicted {}", key);
            return;
        }
        Some(entry) if entry.generation != generation => {
            debug!("Discarding superseded result for {}", key);
            return;
        }
        Some(entry) => {
            entry.in_flight = None;
            // Invalidated after this fetch went out: the data predates the write
            let outdated = entry.invalidated_at >= generation;
            entry.stale = outdated;
            match result {
                Ok(value) => {
                    entry.data = Some(value.clone());
                    entry.error = None;
                    entry.status = QueryStatus::Success;
                }
                Err(err) => {
                    warn!("Query {} failed: {}", key, err);
                    entry.error = Some(err.clone());
                    entry.status = QueryStatus::Error;
                }
            }
            let refetch = outdated && result.is_ok() && entry.subscribers > 0;
            (entry.provides.clone(), refetch)
        }
    };

    // An errored entry leaves the tag index until it is fetched again.
    if result.is_err() {
        state.unindex(key, &provides);
    } else if refetch {
        debug!("{} was invalidated mid-flight, fetching again", key);
        start_fetch(shared, &mut state, key);
    }
}

/// A subscriber's hold on a cache entry
///
/// Dropping it gives up interest; the fetch it may have started keeps
/// running.
pub struct Subscription {
    cache: QueryCache,
    key: QueryKey,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.cache
            .snapshot(&self.key)
            .unwrap_or_else(QuerySnapshot::uninitialized)
    }

    /// Resolve to the latest result, waiting out any fetch in flight
    pub async fn wait(&self) -> FetchResult {
        loop {
            let (generation, pending) = {
                let state = lock(&self.cache.state);
                match state.entries.get(&self.key) {
                    None => return Err(FetchError::new(None, "query is no longer cached")),
                    Some(entry) => match &entry.in_flight {
                        Some(in_flight) => (entry.generation, in_flight.clone()),
                        None => {
                            return match (entry.status, &entry.data, &entry.error) {
                                (QueryStatus::Error, _, Some(err)) => Err(err.clone()),
                                (_, Some(data), _) => Ok(data.clone()),
                                _ => Err(FetchError::new(None, "query has not been fetched")),
                            };
                        }
                    },
                }
            };
            let result = pending.await;

            // A newer fetch may have replaced this one; loop to pick it up.
            // The same fetch still pending means its slot was never cleared.
            let unchanged = lock(&self.cache.state)
                .entries
                .get(&self.key)
                .is_some_and(|e| e.in_flight.is_some() && e.generation == generation);
            if unchanged {
                return result;
            }
        }
    }

    /// Force a new request unless one is already in flight
    pub fn refetch(&self) {
        self.cache.refetch(&self.key);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}
