//! Cache Module
//!
//! Provides a thread-safe LRU cache with TTL expiration, expiration jitter
//! and eviction/expiration callbacks.

mod callbacks;
mod entry;
mod expiration;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use callbacks::Callback;
pub use expiration::{JitterSource, ThreadRngJitter};
pub use stats::Stats;
pub use store::{Cache, CacheBuilder};

pub(crate) use callbacks::{Callbacks, RemovalCause};
pub(crate) use entry::CacheEntry;
pub(crate) use expiration::ExpirationPolicy;
pub(crate) use lru::{Handle, LruList};
pub(crate) use stats::StatsRecorder;
pub(crate) use store::Inner;
