//! Expiration Policy Module
//!
//! Decides when an entry goes stale, including the per-entry jitter that
//! spreads out expiry instants of entries written in a burst.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::cache::CacheEntry;
use crate::config::validate_ages;
use crate::error::Result;

// == Jitter Source ==
/// Random source used to pick an entry's jitter offset.
pub trait JitterSource: Send + Sync {
    /// Returns an integer in `[0, n)`. Only called with `n > 0`.
    fn intn(&self, n: u64) -> u64;
}

/// Default jitter source backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn intn(&self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..n)
    }
}

// == Expiration Policy ==
/// Max/min age bounds plus the jitter source.
///
/// A zero `max_age` disables expiration. A zero `min_age` means "same as
/// `max_age`", i.e. no jitter.
#[derive(Clone)]
pub struct ExpirationPolicy {
    max_age: Duration,
    min_age: Duration,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationPolicy")
            .field("max_age", &self.max_age)
            .field("min_age", &self.min_age)
            .finish_non_exhaustive()
    }
}

impl ExpirationPolicy {
    // == Constructor ==
    /// Creates a policy after checking `min_age <= max_age`.
    pub fn new(
        max_age: Duration,
        min_age: Duration,
        jitter: Arc<dyn JitterSource>,
    ) -> Result<Self> {
        validate_ages(max_age, min_age)?;
        Ok(Self {
            max_age,
            min_age,
            jitter,
        })
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns the effective jitter floor.
    pub fn min_age(&self) -> Duration {
        if self.min_age.is_zero() {
            self.max_age
        } else {
            self.min_age
        }
    }

    /// Returns whether entries can go stale at all.
    pub fn is_enabled(&self) -> bool {
        !self.max_age.is_zero()
    }

    // == Reconfiguration ==
    /// Replaces the max age, keeping the old value if the bounds are violated.
    pub fn set_max_age(&mut self, max_age: Duration) -> Result<()> {
        validate_ages(max_age, self.min_age)?;
        self.max_age = max_age;
        Ok(())
    }

    /// Replaces the min age, keeping the old value if the bounds are violated.
    pub fn set_min_age(&mut self, min_age: Duration) -> Result<()> {
        validate_ages(self.max_age, min_age)?;
        self.min_age = min_age;
        Ok(())
    }

    /// Width of the jitter window, `max_age - min_age`, or zero when disabled.
    pub fn jitter_span(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        self.max_age.saturating_sub(self.min_age())
    }

    // == Timestamp ==
    /// Returns the timestamp to record for an entry written at `now`.
    ///
    /// The offset is drawn once here and never recomputed on later checks.
    pub fn timestamp(&self, now: Instant) -> Instant {
        let span = self.jitter_span();
        if span.is_zero() {
            return now;
        }
        let span_nanos = u64::try_from(span.as_nanos()).unwrap_or(u64::MAX);
        now + Duration::from_nanos(self.jitter.intn(span_nanos))
    }

    // == Freshness ==
    /// Returns true if the entry has not outlived `max_age` as of `now`.
    pub fn is_fresh<K, V>(&self, entry: &CacheEntry<K, V>, now: Instant) -> bool {
        !self.is_enabled() || entry.age(now) <= self.max_age
    }
}
