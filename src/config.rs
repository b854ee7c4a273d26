//! Configuration Module
//!
//! Cache bounds, expiration mode, and loading them from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Expiration Type ==
/// How stale entries are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpirationType {
    /// Staleness is only noticed when an entry is accessed
    #[default]
    Passive,
    /// A background task sweeps the cache every expiration interval
    Active,
}

impl ExpirationType {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "passive" => Some(Self::Passive),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

/// Cache configuration parameters.
///
/// Zero durations mean "unset": a zero `max_age` disables expiration, a zero
/// `min_age` follows `max_age` (no jitter), and a zero `expiration_interval`
/// sweeps every `max_age`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Time after which an entry is stale
    pub max_age: Duration,
    /// Lower bound of the jittered lifetime
    pub min_age: Duration,
    /// Passive or active expiration
    pub expiration_type: ExpirationType,
    /// Period of the active sweep
    pub expiration_interval: Duration,
}

impl Config {
    /// Creates a passive, non-expiring configuration with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `AGECACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `AGECACHE_MAX_AGE_MS` - TTL in milliseconds, 0 disables (default: 0)
    /// - `AGECACHE_MIN_AGE_MS` - Jitter floor in milliseconds (default: 0)
    /// - `AGECACHE_EXPIRATION` - `passive` or `active` (default: passive)
    /// - `AGECACHE_EXPIRATION_INTERVAL_MS` - Active sweep period (default: max age)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_parse("AGECACHE_CAPACITY").unwrap_or(defaults.capacity),
            max_age: env_millis("AGECACHE_MAX_AGE_MS").unwrap_or(defaults.max_age),
            min_age: env_millis("AGECACHE_MIN_AGE_MS").unwrap_or(defaults.min_age),
            expiration_type: env::var("AGECACHE_EXPIRATION")
                .ok()
                .and_then(|v| ExpirationType::parse(&v))
                .unwrap_or(defaults.expiration_type),
            expiration_interval: env_millis("AGECACHE_EXPIRATION_INTERVAL_MS")
                .unwrap_or(defaults.expiration_interval),
        }
    }

    // == Validate ==
    /// Checks every construction-time bound.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }
        validate_ages(self.max_age, self.min_age)?;
        if self.expiration_type == ExpirationType::Active && self.effective_interval().is_zero() {
            return Err(CacheError::InvalidConfig(
                "active expiration requires a positive max age or expiration interval"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the active sweep period, falling back to `max_age` when unset.
    pub fn effective_interval(&self) -> Duration {
        if self.expiration_interval.is_zero() {
            self.max_age
        } else {
            self.expiration_interval
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            max_age: Duration::ZERO,
            min_age: Duration::ZERO,
            expiration_type: ExpirationType::Passive,
            expiration_interval: Duration::ZERO,
        }
    }
}

/// Validates the `min_age <= max_age` relation shared by construction and
/// runtime reconfiguration.
pub(crate) fn validate_ages(max_age: Duration, min_age: Duration) -> Result<()> {
    if !max_age.is_zero() && !min_age.is_zero() && min_age > max_age {
        return Err(CacheError::InvalidConfig(format!(
            "min age {:?} exceeds max age {:?}",
            min_age, max_age
        )));
    }
    Ok(())
}

// == Utility Functions ==
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}
