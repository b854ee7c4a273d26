//! Callback Dispatch Module
//!
//! Holds the user hooks fired for policy-driven removals.

use std::fmt;
use std::sync::Arc;

/// Hook invoked with the key and value of a removed entry.
///
/// Runs while the cache's write lock is held and must not call back into the cache.
pub type Callback<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync>;

/// Why an entry left the cache through policy rather than `remove`/`clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Dropped as least recently used
    Evicted,
    /// Found stale by `get` or the active reaper
    Expired,
}

// == Callbacks ==
/// Eviction and expiration hooks. Exactly one fires per policy removal.
pub struct Callbacks<K, V> {
    on_eviction: Option<Callback<K, V>>,
    on_expiration: Option<Callback<K, V>>,
}

impl<K, V> Default for Callbacks<K, V> {
    fn default() -> Self {
        Self {
            on_eviction: None,
            on_expiration: None,
        }
    }
}

impl<K, V> fmt::Debug for Callbacks<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_eviction", &self.on_eviction.is_some())
            .field("on_expiration", &self.on_expiration.is_some())
            .finish()
    }
}

impl<K, V> Callbacks<K, V> {
    pub fn new(
        on_eviction: Option<Callback<K, V>>,
        on_expiration: Option<Callback<K, V>>,
    ) -> Self {
        Self {
            on_eviction,
            on_expiration,
        }
    }

    pub fn set_on_eviction(&mut self, callback: Option<Callback<K, V>>) {
        self.on_eviction = callback;
    }

    pub fn set_on_expiration(&mut self, callback: Option<Callback<K, V>>) {
        self.on_expiration = callback;
    }

    // == Dispatch ==
    /// Invokes the hook matching `cause`, if one is registered.
    pub fn dispatch(&self, cause: RemovalCause, key: &K, value: &V) {
        let hook = match cause {
            RemovalCause::Evicted => &self.on_eviction,
            RemovalCause::Expired => &self.on_expiration,
        };
        if let Some(hook) = hook {
            hook(key, value);
        }
    }
}
