//! agecache - A thread-safe LRU cache with TTL expiration
//!
//! Entries are evicted in strict least-recently-used order once capacity is
//! exceeded, and go stale after a configurable max age. Expiry instants can
//! be jittered to avoid mass expiration, and stale entries are found either
//! on access (passive) or by a background sweep (active).

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheBuilder, JitterSource, Stats};
pub use config::{Config, ExpirationType};
pub use error::{CacheError, Result};
