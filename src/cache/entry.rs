//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single cache entry with its key, value and age timestamp.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    /// The key this entry is indexed under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Creation or refresh instant, already advanced by jitter
    pub timestamp: Instant,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new cache entry stamped at `timestamp`.
    pub fn new(key: K, value: V, timestamp: Instant) -> Self {
        Self {
            key,
            value,
            timestamp,
        }
    }

    // == Refresh ==
    /// Replaces the value in place and re-stamps the entry.
    pub fn refresh(&mut self, value: V, timestamp: Instant) {
        self.value = value;
        self.timestamp = timestamp;
    }

    // == Age ==
    /// Returns how long ago the entry was stamped.
    ///
    /// A jittered timestamp may lie in the future, in which case the age is zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }
}
