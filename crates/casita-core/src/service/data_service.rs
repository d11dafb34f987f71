// ── Generic cache / fetch / publish primitive ──
//
// One `DataService<T>` per resource: lazily fetches through a supplied
// async function, caches the result, persists it for cold starts when
// configured, and fans every new value out to subscribers in
// registration order. Callers always receive deep copies — the cache is
// never aliased outward.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use casita_api::{ApiError, KeyedStore};

use super::registry::ServiceRegistry;

/// Prefix for persisted cache entries in the keyed store.
const STORE_KEY_PREFIX: &str = "DataService_";

/// Async fetch function bound to one REST endpoint. Retry and caching are
/// entirely the service's job; the function just performs one request.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Subscriber callback. Invoked synchronously on every publish with its
/// own copy of the new value.
pub type SubscriberFn<T> = Arc<dyn Fn(T) + Send + Sync>;

// ── Options ──────────────────────────────────────────────────────────

/// Cold-start cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Never touch the keyed store.
    #[default]
    Off,

    /// Seed from the store at construction, but stay "not fetched" until a
    /// real network fetch succeeds. The first subscriber sees
    /// stale-then-fresh without blocking.
    Full,

    /// Seed from the store at construction and treat the seed as fetched:
    /// no network call is made unless explicitly forced. For data that is
    /// acceptable to show stale in a shell that may start offline.
    BootOnly,
}

/// Construction options for a [`DataService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub cache_mode: CacheMode,

    /// Persisted-entry key; defaults to the service name.
    pub cache_key: Option<String>,
}

// ── Attach state machine ─────────────────────────────────────────────

/// What a newly attached subscriber finds. Each state maps to exactly one
/// first-delivery behavior (see [`DataService::attach`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttachState {
    /// No fetch ever started and no warm cache: block on a full fetch.
    Empty,
    /// Cold-start cache seeded the data and no fetch has started yet:
    /// deliver the stale value immediately, refresh in the background.
    CacheWarm,
    /// A fetch already started or completed: deliver the current cache.
    Fetched,
}

fn attach_state(fetch_started: bool, loaded_from_cache: bool) -> AttachState {
    if loaded_from_cache && !fetch_started {
        AttachState::CacheWarm
    } else if fetch_started {
        AttachState::Fetched
    } else {
        AttachState::Empty
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Handle to one attached subscriber. [`unsubscribe`](Self::unsubscribe)
/// is idempotent; dropping the handle does NOT detach — view adapters own
/// that lifecycle.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

struct Subscriber<T> {
    id: u64,
    callback: SubscriberFn<T>,
}

// ── Service state ────────────────────────────────────────────────────

struct State<T> {
    data: T,
    fetched: bool,
    fetch_started: bool,
    loaded_from_cache: bool,
    /// Revision of the last applied value. A fetch takes its revision
    /// ticket before suspending; results older than the last applied
    /// revision are dropped, so the latest revision always wins the cache.
    last_applied: u64,
}

// ── DataService ──────────────────────────────────────────────────────

/// Per-resource cache + fetch-on-demand + publish/subscribe, with
/// optional cold-start persistence.
///
/// All suspension points happen with no lock held: flags set before a
/// fetch are observable by any task interleaved with it. Concurrent
/// `get_data` callers before the first fetch resolves are not
/// deduplicated — callers needing at-most-one-in-flight semantics go
/// through [`attach`](Self::attach) or [`trigger_load`](Self::trigger_load).
pub struct DataService<T> {
    name: String,
    default_data: T,
    options: ServiceOptions,
    store: Arc<dyn KeyedStore>,
    fetch: FetchFn<T>,
    state: Mutex<State<T>>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
    next_subscriber_id: AtomicU64,
    next_revision: AtomicU64,
    /// `true` while `fetched` holds real data; observed by `await_loaded`.
    loaded: watch::Sender<bool>,
    /// Back-reference set once at construction; lets `&self` methods hand
    /// out detach handles and spawn background refreshes.
    self_weak: OnceLock<Weak<Self>>,
}

impl<T> DataService<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a service and register it for global reset.
    ///
    /// When caching is enabled, a persisted entry seeds the initial data;
    /// an unparsable entry is treated as a cache miss.
    pub fn new(
        name: impl Into<String>,
        default_data: T,
        fetch: FetchFn<T>,
        options: ServiceOptions,
        store: Arc<dyn KeyedStore>,
        registry: &ServiceRegistry,
    ) -> Arc<Self> {
        let name = name.into();
        let mut data = default_data.clone();
        let mut seeded = false;

        if options.cache_mode != CacheMode::Off {
            let key = store_key(&name, &options);
            if let Some(raw) = store.get(&key) {
                match serde_json::from_str::<T>(&raw) {
                    Ok(value) => {
                        debug!(service = %name, "seeded from cold-start cache");
                        data = value;
                        seeded = true;
                    }
                    Err(e) => {
                        debug!(service = %name, error = %e, "ignoring corrupt cache entry");
                    }
                }
            }
        }

        let boot_fetched = seeded && options.cache_mode == CacheMode::BootOnly;
        let (loaded, _) = watch::channel(boot_fetched);

        let service = Arc::new(Self {
            name,
            default_data,
            options,
            store,
            fetch,
            state: Mutex::new(State {
                data,
                fetched: boot_fetched,
                fetch_started: boot_fetched,
                loaded_from_cache: seeded,
                last_applied: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(0),
            next_revision: AtomicU64::new(0),
            loaded,
            self_weak: OnceLock::new(),
        });
        let _ = service.self_weak.set(Arc::downgrade(&service));

        registry.register(Arc::clone(&service) as Arc<dyn super::registry::ResettableService>);
        service
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current cached value, as an independent deep copy. Never triggers I/O.
    pub fn data(&self) -> T {
        self.state().data.clone()
    }

    /// Copy of the construction-time default.
    pub fn default_data(&self) -> T {
        self.default_data.clone()
    }

    /// `true` once a fetch has completed successfully at least once.
    pub fn fetched(&self) -> bool {
        self.state().fetched
    }

    /// `true` once a fetch has been initiated (covers the in-flight window).
    pub fn fetch_started(&self) -> bool {
        self.state().fetch_started
    }

    /// `true` while the current data came from the cold-start cache rather
    /// than the network.
    pub fn loaded_from_cache(&self) -> bool {
        self.state().loaded_from_cache
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Cached data if already fetched, otherwise one fetch.
    pub async fn get_data(&self) -> Result<T, ApiError> {
        if self.fetched() {
            return Ok(self.data());
        }
        self.force_fetch().await
    }

    /// Unconditionally fetch, cache, persist, and publish.
    ///
    /// On failure the fetch-state flags are reset so the next access
    /// retries, and the error is rethrown untouched. If a newer value was
    /// applied while this fetch was in flight, the stale result is dropped
    /// and the current cache is returned instead.
    pub async fn force_fetch(&self) -> Result<T, ApiError> {
        let ticket = self.take_revision();
        self.state().fetch_started = true;

        match (self.fetch)().await {
            Ok(value) => Ok(self.apply(ticket, value)),
            Err(e) => {
                {
                    let mut state = self.state();
                    // A concurrent fetch or optimistic update may have
                    // succeeded in the meantime; keep its state in that case.
                    if state.last_applied < ticket {
                        state.fetched = false;
                        state.fetch_started = false;
                    }
                }
                Err(e)
            }
        }
    }

    /// Register `callback` for future publishes and perform the
    /// state-appropriate first delivery:
    ///
    /// - cache warm, nothing fetched: deliver the stale value now, refresh
    ///   in the background (stale-then-fresh, never blocks);
    /// - nothing ever started: await a full fetch, whose publish reaches
    ///   the new subscriber;
    /// - otherwise: deliver the current cache now.
    ///
    /// If the blocking first fetch fails, the subscriber is detached again
    /// before the error propagates, so a failed mount leaves nothing behind.
    pub async fn attach(&self, callback: SubscriberFn<T>) -> Result<Subscription, ApiError> {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers().push(Subscriber {
            id,
            callback: Arc::clone(&callback),
        });
        let subscription = self.subscription(id);

        let (state, data) = {
            let mut state = self.state();
            let attach = attach_state(state.fetch_started, state.loaded_from_cache);
            // Claim the refresh before releasing the lock: a concurrent
            // warm attach or `trigger_load` must already see the fetch as
            // started. A failed refresh clears the flag again.
            if attach == AttachState::CacheWarm {
                state.fetch_started = true;
            }
            (attach, state.data.clone())
        };

        match state {
            AttachState::CacheWarm => {
                callback(data);
                if let Some(service) = self.self_weak.get().and_then(Weak::upgrade) {
                    tokio::spawn(async move {
                        if let Err(e) = service.force_fetch().await {
                            warn!(service = %service.name, error = %e, "background refresh failed");
                        }
                    });
                }
            }
            AttachState::Empty => {
                if let Err(e) = self.force_fetch().await {
                    subscription.unsubscribe();
                    return Err(e);
                }
            }
            AttachState::Fetched => callback(data),
        }

        Ok(subscription)
    }

    /// Warm the cache without subscribing: one fetch if none has started
    /// or completed yet, otherwise a no-op.
    pub async fn trigger_load(&self) -> Result<(), ApiError> {
        let needs_fetch = {
            let state = self.state();
            !state.fetch_started && !state.fetched
        };
        if needs_fetch {
            self.force_fetch().await?;
        }
        Ok(())
    }

    /// Resolve once real data exists: immediately if already fetched,
    /// otherwise on the next successful publish.
    pub async fn await_loaded(&self) {
        let mut rx = self.loaded.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    /// Optimistic-update escape hatch: callers who already know the new
    /// truth push it into the cache and fan it out without a refetch.
    /// Marks the service as fetched and not cache-loaded.
    pub fn post_new_data(&self, data: T) {
        let ticket = self.take_revision();
        self.apply(ticket, data);
    }

    /// Mutate the cached value in place under the state lock, then persist
    /// and republish. Returning `false` from the closure marks the value
    /// unchanged: the cache keeps its revision and nothing is published.
    ///
    /// Merge paths (push deltas, optimistic mutators) go through here; a
    /// read-copy-post sequence outside the lock could lose a concurrent
    /// merge's edit. The closure runs with the lock held and must not block.
    pub fn update_in_place(&self, mutate: impl FnOnce(&mut T) -> bool) {
        let current = {
            let mut state = self.state();
            if !mutate(&mut state.data) {
                return;
            }
            state.fetched = true;
            state.fetch_started = true;
            state.loaded_from_cache = false;
            state.last_applied = self.take_revision();
            state.data.clone()
        };
        self.persist(&current);
        self.publish(&current);
    }

    /// Restore the default value, forget all fetch state, and delete the
    /// persisted entry. Subscribers stay attached and will receive the
    /// default value on the next publish.
    pub fn reset(&self) {
        {
            let mut state = self.state();
            state.data = self.default_data.clone();
            state.fetched = false;
            state.fetch_started = false;
            state.loaded_from_cache = false;
        }
        if self.options.cache_mode != CacheMode::Off {
            self.store.remove(&store_key(&self.name, &self.options));
        }
        self.loaded.send_if_modified(|loaded| {
            let was = *loaded;
            *loaded = false;
            was
        });
    }

    // ── Internals ────────────────────────────────────────────────────

    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber<T>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn take_revision(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store `value` as the new cache if `ticket` is still current, then
    /// persist and publish it. Returns the cache content after the call
    /// (the newer value when the ticket was stale).
    fn apply(&self, ticket: u64, value: T) -> T {
        let current = {
            let mut state = self.state();
            if ticket < state.last_applied {
                debug!(service = %self.name, ticket, last = state.last_applied,
                    "dropping stale result");
                return state.data.clone();
            }
            state.data = value;
            state.fetched = true;
            state.fetch_started = true;
            state.loaded_from_cache = false;
            state.last_applied = ticket;
            state.data.clone()
        };

        self.persist(&current);
        self.publish(&current);
        current
    }

    fn persist(&self, value: &T) {
        if self.options.cache_mode == CacheMode::Off {
            return;
        }
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(&store_key(&self.name, &self.options), &raw),
            Err(e) => warn!(service = %self.name, error = %e, "failed to serialize cache entry"),
        }
    }

    /// Fan the value out to every subscriber in registration order, each
    /// with its own copy. Callbacks run with no lock held, so they may
    /// re-enter the service.
    fn publish(&self, value: &T) {
        let callbacks: Vec<SubscriberFn<T>> = self
            .subscribers()
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect();
        for callback in callbacks {
            callback(value.clone());
        }
        self.loaded.send_if_modified(|loaded| {
            let changed = !*loaded;
            *loaded = true;
            changed
        });
    }

    fn subscription(&self, id: u64) -> Subscription {
        let weak = self.self_weak.get().cloned();
        Subscription {
            cancel: Box::new(move || {
                if let Some(service) = weak.as_ref().and_then(Weak::upgrade) {
                    service.subscribers().retain(|s| s.id != id);
                }
            }),
        }
    }
}

fn store_key(name: &str, options: &ServiceOptions) -> String {
    format!(
        "{STORE_KEY_PREFIX}{}",
        options.cache_key.as_deref().unwrap_or(name)
    )
}

// ── Tests ────────────────────────────────────────────────────────────
