//! Cache Statistics Module
//!
//! Tracks cache activity counters and produces point-in-time snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats ==
/// Snapshot of cache statistics.
///
/// `capacity` and `count` are gauges; every other field is a monotonic counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Maximum number of entries
    pub capacity: u64,
    /// Entries in the cache when the snapshot was taken
    pub count: u64,
    /// Number of `set` calls
    pub sets: u64,
    /// Number of `get` calls
    pub gets: u64,
    /// Lookups that returned a fresh value
    pub hits: u64,
    /// Lookups that found nothing or a stale entry
    pub misses: u64,
    /// Entries removed by the LRU policy
    pub evictions: u64,
}

impl Stats {
    // == Delta ==
    /// Returns counters accumulated since `previous`.
    ///
    /// Gauges are carried over from `self` unchanged.
    pub fn delta(&self, previous: &Stats) -> Stats {
        Stats {
            capacity: self.capacity,
            count: self.count,
            sets: self.sets.saturating_sub(previous.sets),
            gets: self.gets.saturating_sub(previous.gets),
            hits: self.hits.saturating_sub(previous.hits),
            misses: self.misses.saturating_sub(previous.misses),
            evictions: self.evictions.saturating_sub(previous.evictions),
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Live counters shared by all cache operations.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    sets: AtomicU64,
    gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters alongside the given gauges.
    pub fn snapshot(&self, capacity: usize, count: usize) -> Stats {
        Stats {
            capacity: capacity as u64,
            count: count as u64,
            sets: self.sets.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_new() {
        let stats = StatsRecorder::new().snapshot(10, 0);
        assert_eq!(
            stats,
            Stats {
                capacity: 10,
                ..Stats::default()
            }
        );
    }

    #[test]
    fn test_recorder_counts() {
        let recorder = StatsRecorder::new();
        recorder.record_set();
        recorder.record_get();
        recorder.record_get();
        recorder.record_hit();
        recorder.record_miss();
        recorder.record_eviction();

        let stats = recorder.snapshot(100, 3);
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_delta_keeps_gauges() {
        let previous = Stats {
            capacity: 100,
            count: 5,
            sets: 5,
            gets: 10,
            hits: 7,
            misses: 3,
            evictions: 0,
        };
        let current = Stats {
            capacity: 100,
            count: 2,
            sets: 8,
            gets: 13,
            hits: 9,
            misses: 4,
            evictions: 2,
        };

        let delta = current.delta(&previous);
        assert_eq!(
            delta,
            Stats {
                capacity: 100,
                count: 2,
                sets: 3,
                gets: 3,
                hits: 2,
                misses: 1,
                evictions: 2,
            }
        );
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let recorder = StatsRecorder::new();
        let mut stats = recorder.snapshot(100, 0);
        stats.hits += 1;
        stats.misses += 1;

        assert_eq!(
            recorder.snapshot(100, 0),
            Stats {
                capacity: 100,
                ..Stats::default()
            }
        );
    }

    #[test]
    fn test_hit_rate() {
        let mut stats = Stats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 1;
        stats.misses = 1;
        assert_eq!(stats.hit_rate(), 0.5);

        stats.misses = 0;
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = Stats {
            capacity: 10,
            hits: 2,
            ..Stats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["capacity"], 10);
        assert_eq!(json["hits"], 2);
        assert_eq!(json["evictions"], 0);
    }
}
