//! Cache Store Module
//!
//! Main cache engine combining the key index, the LRU recency list, the
//! expiration policy and the removal callbacks behind a single lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle as RuntimeHandle;
use tracing::{debug, warn};

use crate::cache::{
    Callback, Callbacks, CacheEntry, ExpirationPolicy, Handle, JitterSource, LruList,
    RemovalCause, Stats, StatsRecorder, ThreadRngJitter,
};
use crate::config::{Config, ExpirationType};
use crate::error::Result;
use crate::tasks::{spawn_reaper, ReaperHandle};

/// Everything guarded by the cache lock.
struct State<K, V> {
    /// Key to slot in the recency list
    index: HashMap<K, Handle>,
    /// Entries ordered by recency
    order: LruList<K, V>,
    policy: ExpirationPolicy,
    callbacks: Callbacks<K, V>,
}

impl<K: Eq + Hash, V> State<K, V> {
    fn unlink(&mut self, handle: Handle) -> Option<CacheEntry<K, V>> {
        let entry = self.order.remove(handle)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    fn evict_oldest(&mut self, stats: &StatsRecorder) -> bool {
        let Some(entry) = self.order.pop_back() else {
            return false;
        };
        self.index.remove(&entry.key);
        stats.record_eviction();
        self.callbacks
            .dispatch(RemovalCause::Evicted, &entry.key, &entry.value);
        true
    }

    fn expire(&mut self, handle: Handle) {
        if let Some(entry) = self.unlink(handle) {
            self.callbacks
                .dispatch(RemovalCause::Expired, &entry.key, &entry.value);
        }
    }

    fn is_fresh(&self, handle: Handle, now: Instant) -> bool {
        self.order
            .get(handle)
            .is_some_and(|entry| self.policy.is_fresh(entry, now))
    }
}

/// Lock-protected state plus the lock-free counters, shared with the reaper.
pub(crate) struct Inner<K, V> {
    state: RwLock<State<K, V>>,
    stats: StatsRecorder,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    pub(crate) fn keys(&self) -> Vec<K> {
        self.state.read().index.keys().cloned().collect()
    }

    /// Removes `key` if it is stale, firing the expiration hook.
    ///
    /// Leaves recency and counters untouched.
    pub(crate) fn expire_if_stale(&self, key: &K) -> bool {
        let now = Instant::now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        match state.index.get(key).copied() {
            Some(handle) if !state.is_fresh(handle, now) => {
                state.expire(handle);
                true
            }
            _ => false,
        }
    }
}

// == Cache ==
/// Thread-safe, capacity-bounded LRU cache with TTL expiration.
///
/// All methods take `&self`; share the cache across threads with an `Arc`.
/// Callbacks run while the write lock is held and must not call back into the cache.
pub struct Cache<K, V> {
    inner: Arc<Inner<K, V>>,
    reaper: Mutex<Option<ReaperHandle>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache from `config` with no callbacks.
    pub fn new(config: Config) -> Result<Self> {
        CacheBuilder::from_config(config).build()
    }

    /// Starts a builder for a cache holding at most `capacity` entries.
    pub fn builder(capacity: usize) -> CacheBuilder<K, V> {
        CacheBuilder::from_config(Config::with_capacity(capacity))
    }

    // == Set ==
    /// Stores a key-value pair, marking it most recently used.
    ///
    /// An existing key has its value and timestamp replaced. Returns true if
    /// inserting a new key pushed out the least recently used entry.
    pub fn set(&self, key: K, value: V) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.state.write();
        let state = &mut *guard;

        self.inner.stats.record_set();
        let timestamp = state.policy.timestamp(now);

        if let Some(handle) = state.index.get(&key).copied() {
            if let Some(entry) = state.order.get_mut(handle) {
                entry.refresh(value, timestamp);
            }
            state.order.move_to_front(handle);
            return false;
        }

        let handle = state
            .order
            .push_front(CacheEntry::new(key.clone(), value, timestamp));
        state.index.insert(key, handle);

        if state.order.len() > self.inner.capacity {
            state.evict_oldest(&self.inner.stats)
        } else {
            false
        }
    }

    // == Get ==
    /// Retrieves a value and marks it most recently used.
    ///
    /// A stale entry is removed, fires the expiration hook and counts as a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        let stats = &self.inner.stats;

        stats.record_get();

        let Some(handle) = state.index.get(key).copied() else {
            stats.record_miss();
            return None;
        };

        if !state.is_fresh(handle, now) {
            state.expire(handle);
            stats.record_miss();
            return None;
        }

        state.order.move_to_front(handle);
        stats.record_hit();
        state.order.get(handle).map(|entry| entry.value.clone())
    }

    // == Has ==
    /// Returns true if a fresh entry exists, without touching recency or stats.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let state = self.inner.state.read();
        state
            .index
            .get(key)
            .is_some_and(|handle| state.is_fresh(*handle, now))
    }

    // == Peek ==
    /// Returns a fresh value without touching recency or stats.
    ///
    /// Stale entries read as absent but are left in place.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let state = self.inner.state.read();
        let handle = *state.index.get(key)?;
        state
            .order
            .get(handle)
            .filter(|entry| state.policy.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    // == Remove ==
    /// Deletes an entry. Never fires eviction or expiration hooks.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.inner.state.write();
        match state.index.remove(key) {
            Some(handle) => {
                state.order.remove(handle);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Evicts the least recently used entry, firing the eviction hook.
    ///
    /// Returns false on an empty cache.
    pub fn evict_oldest(&self) -> bool {
        self.inner.state.write().evict_oldest(&self.inner.stats)
    }

    // == Length ==
    /// Returns the number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.inner.state.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns every key in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.keys()
    }

    /// Returns every key from least to most recently used.
    pub fn ordered_keys(&self) -> Vec<K> {
        self.inner
            .state
            .read()
            .order
            .iter_oldest_first()
            .map(|entry| entry.key.clone())
            .collect()
    }

    // == Clear ==
    /// Drops every entry without firing hooks. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        state.index.clear();
        state.order.clear();
    }

    // == Expiration Bounds ==
    pub fn max_age(&self) -> Duration {
        self.inner.state.read().policy.max_age()
    }

    pub fn min_age(&self) -> Duration {
        self.inner.state.read().policy.min_age()
    }

    /// Replaces the max age. Zero disables expiration.
    ///
    /// Fails, keeping the old bound, if it would fall below a set min age.
    pub fn set_max_age(&self, max_age: Duration) -> Result<()> {
        let result = self.inner.state.write().policy.set_max_age(max_age);
        if let Err(err) = &result {
            warn!("Rejected max age {:?}: {}", max_age, err);
        }
        result
    }

    /// Replaces the min age. Zero follows the max age.
    ///
    /// Fails, keeping the old bound, if it would exceed the max age.
    pub fn set_min_age(&self, min_age: Duration) -> Result<()> {
        let result = self.inner.state.write().policy.set_min_age(min_age);
        if let Err(err) = &result {
            warn!("Rejected min age {:?}: {}", min_age, err);
        }
        result
    }

    // == Callbacks ==
    /// Replaces the hook fired when an entry is evicted by the LRU policy.
    pub fn on_eviction<F>(&self, callback: F)
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        let callback: Callback<K, V> = Arc::new(callback);
        self.inner
            .state
            .write()
            .callbacks
            .set_on_eviction(Some(callback));
    }

    /// Replaces the hook fired when an entry is found stale.
    pub fn on_expiration<F>(&self, callback: F)
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        let callback: Callback<K, V> = Arc::new(callback);
        self.inner
            .state
            .write()
            .callbacks
            .set_on_expiration(Some(callback));
    }

    // == Stats ==
    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> Stats {
        let state = self.inner.state.read();
        self.inner
            .stats
            .snapshot(self.inner.capacity, state.order.len())
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let state = self.inner.state.read();
        state.index.len() == state.order.len()
            && state.order.len() <= self.inner.capacity
            && state.index.iter().all(|(key, handle)| {
                state
                    .order
                    .get(*handle)
                    .is_some_and(|entry| entry.key == *key)
            })
    }
}

impl<K, V> Cache<K, V> {
    /// Returns true while an active reaper is sweeping this cache.
    ///
    /// Goes false after `close`, or when the runtime handed to
    /// [`CacheBuilder::runtime`] shuts down.
    pub fn reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .is_some_and(|reaper| reaper.is_running())
    }

    // == Close ==
    /// Stops the active reaper, if any. Idempotent; also done on drop.
    pub fn close(&self) {
        if let Some(reaper) = self.reaper.lock().take() {
            if !reaper.is_running() {
                warn!("Active reaper had already exited before close");
            }
            reaper.stop();
        }
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Cache")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.order.len())
            .field("policy", &state.policy)
            .field("reaper_running", &self.reaper_running())
            .finish()
    }
}

// == Cache Builder ==
/// Fluent construction of a [`Cache`] with callbacks and a custom jitter source.
pub struct CacheBuilder<K, V> {
    config: Config,
    on_eviction: Option<Callback<K, V>>,
    on_expiration: Option<Callback<K, V>>,
    jitter: Option<Arc<dyn JitterSource>>,
    runtime: Option<RuntimeHandle>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            on_eviction: None,
            on_expiration: None,
            jitter: None,
            runtime: None,
        }
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.config.max_age = max_age;
        self
    }

    pub fn min_age(mut self, min_age: Duration) -> Self {
        self.config.min_age = min_age;
        self
    }

    pub fn expiration_type(mut self, expiration_type: ExpirationType) -> Self {
        self.config.expiration_type = expiration_type;
        self
    }

    pub fn expiration_interval(mut self, interval: Duration) -> Self {
        self.config.expiration_interval = interval;
        self
    }

    pub fn on_eviction<F>(mut self, callback: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.on_eviction = Some(Arc::new(callback));
        self
    }

    pub fn on_expiration<F>(mut self, callback: F) -> Self
    where
        F: Fn(&K, &V) + Send + Sync + 'static,
    {
        self.on_expiration = Some(Arc::new(callback));
        self
    }

    /// Overrides the random source used for expiration jitter.
    pub fn jitter_source<J>(mut self, jitter: J) -> Self
    where
        J: JitterSource + 'static,
    {
        self.jitter = Some(Arc::new(jitter));
        self
    }

    /// Runs the active reaper as a task on `runtime` instead of on its own thread.
    ///
    /// The reaper then stops when that runtime shuts down; see
    /// [`Cache::reaper_running`].
    pub fn runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    // == Build ==
    /// Validates the configuration and creates the cache.
    ///
    /// Active expiration starts the reaper, which needs no ambient tokio runtime.
    pub fn build(self) -> Result<Cache<K, V>> {
        let config = self.config;
        config.validate()?;

        let jitter = self
            .jitter
            .unwrap_or_else(|| Arc::new(ThreadRngJitter) as Arc<dyn JitterSource>);
        let policy = ExpirationPolicy::new(config.max_age, config.min_age, jitter)?;
        let min_age = policy.min_age();

        let inner = Arc::new(Inner {
            state: RwLock::new(State {
                index: HashMap::with_capacity(config.capacity.min(1024)),
                order: LruList::with_capacity(config.capacity.min(1024)),
                policy,
                callbacks: Callbacks::new(self.on_eviction, self.on_expiration),
            }),
            stats: StatsRecorder::new(),
            capacity: config.capacity,
        });

        let reaper = match config.expiration_type {
            ExpirationType::Active => Some(spawn_reaper(
                Arc::downgrade(&inner),
                config.effective_interval(),
                self.runtime,
            )?),
            ExpirationType::Passive => None,
        };

        debug!(
            "Cache created: capacity={}, max_age={:?}, min_age={:?}, expiration={:?}",
            config.capacity,
            config.max_age,
            min_age,
            config.expiration_type
        );

        Ok(Cache {
            inner,
            reaper: Mutex::new(reaper),
        })
    }
}
