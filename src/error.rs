//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Lookups never fail; only construction and bound reconfiguration do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Configuration violates a bound (capacity, ages, sweep interval)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The active reaper's thread or runtime could not be started
    #[error("Failed to start active reaper: {0}")]
    ReaperSpawn(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
