//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a simple recency-list model.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::Cache;

// == Test Configuration ==
const TEST_CAPACITY: usize = 8;

// == Strategies ==
/// Generates keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    Get { key: String },
    Peek { key: String },
    Has { key: String },
    Remove { key: String },
    EvictOldest,
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        4 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Peek { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Has { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => Just(CacheOp::EvictOldest),
        1 => Just(CacheOp::Clear),
    ]
}

// == Model ==
/// Reference LRU: front = least recently used.
#[derive(Debug, Default)]
struct Model {
    order: VecDeque<(String, u32)>,
    capacity: usize,
    evictions: u64,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.order.iter().position(|(k, _)| k == key)
    }

    fn set(&mut self, key: String, value: u32) -> bool {
        if let Some(pos) = self.position(&key) {
            self.order.remove(pos);
            self.order.push_back((key, value));
            return false;
        }
        self.order.push_back((key, value));
        if self.order.len() > self.capacity {
            self.order.pop_front();
            self.evictions += 1;
            return true;
        }
        false
    }

    fn get(&mut self, key: &str) -> Option<u32> {
        let pos = self.position(key)?;
        let entry = self.order.remove(pos)?;
        let value = entry.1;
        self.order.push_back(entry);
        Some(value)
    }

    fn peek(&self, key: &str) -> Option<u32> {
        self.position(key).map(|pos| self.order[pos].1)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let evicted = self.order.pop_front().is_some();
        if evicted {
            self.evictions += 1;
        }
        evicted
    }

    fn keys(&self) -> Vec<String> {
        self.order.iter().map(|(k, _)| k.clone()).collect()
    }
}

fn cache_with_counter(capacity: usize) -> (Cache<String, u32>, Arc<AtomicU64>) {
    let evicted = Arc::new(AtomicU64::new(0));
    let counter = evicted.clone();
    let cache = Cache::builder(capacity)
        .on_eviction(move |_: &String, _: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();
    (cache, evicted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of operations, the cache agrees with the model on every
    // result and on the full recency order, and index/order stay consistent
    // and within capacity after every call.
    #[test]
    fn prop_matches_lru_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let (cache, eviction_hooks) = cache_with_counter(TEST_CAPACITY);
        let mut model = Model::new(TEST_CAPACITY);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    prop_assert_eq!(cache.set(key.clone(), value), model.set(key, value));
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key));
                }
                CacheOp::Peek { key } => {
                    prop_assert_eq!(cache.peek(&key), model.peek(&key));
                }
                CacheOp::Has { key } => {
                    prop_assert_eq!(cache.has(&key), model.peek(&key).is_some());
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(cache.remove(&key), model.remove(&key));
                }
                CacheOp::EvictOldest => {
                    prop_assert_eq!(cache.evict_oldest(), model.evict_oldest());
                }
                CacheOp::Clear => {
                    cache.clear();
                    model.order.clear();
                }
            }

            prop_assert!(cache.is_consistent(), "Index and recency order diverged");
            prop_assert!(cache.len() <= TEST_CAPACITY);
            prop_assert_eq!(cache.ordered_keys(), model.keys());
        }

        prop_assert_eq!(cache.stats().evictions, model.evictions);
        prop_assert_eq!(eviction_hooks.load(Ordering::SeqCst), model.evictions);
    }

    // For any sequence of operations, the statistics reflect exactly the
    // calls that were made.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let cache: Cache<String, u32> = Cache::builder(TEST_CAPACITY).build().unwrap();
        let mut expected_sets: u64 = 0;
        let mut expected_gets: u64 = 0;
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut previous = cache.stats();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key, value);
                    expected_sets += 1;
                }
                CacheOp::Get { key } => {
                    expected_gets += 1;
                    match cache.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Peek { key } => {
                    cache.peek(&key);
                }
                CacheOp::Has { key } => {
                    cache.has(&key);
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                }
                CacheOp::EvictOldest => {
                    cache.evict_oldest();
                }
                CacheOp::Clear => cache.clear(),
            }

            let current = cache.stats();
            // Counters never go backwards, even across clear
            prop_assert!(current.sets >= previous.sets);
            prop_assert!(current.gets >= previous.gets);
            prop_assert!(current.hits >= previous.hits);
            prop_assert!(current.misses >= previous.misses);
            prop_assert!(current.evictions >= previous.evictions);
            previous = current;
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.sets, expected_sets, "Sets mismatch");
        prop_assert_eq!(stats.gets, expected_gets, "Gets mismatch");
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.count, cache.len() as u64, "Count mismatch");
        prop_assert_eq!(stats.capacity, TEST_CAPACITY as u64);
    }

    // Inserting capacity + 1 distinct keys evicts exactly the first one.
    #[test]
    fn prop_capacity_eviction(
        keys in prop::collection::hash_set("[a-z]{1,12}", 2..32)
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() - 1;
        let (cache, eviction_hooks) = cache_with_counter(capacity);

        for (i, key) in keys.iter().enumerate() {
            let evicted = cache.set(key.clone(), i as u32);
            prop_assert_eq!(evicted, i == capacity);
        }

        prop_assert_eq!(cache.len(), capacity);
        prop_assert_eq!(cache.stats().evictions, 1);
        prop_assert_eq!(eviction_hooks.load(Ordering::SeqCst), 1);
        prop_assert!(!cache.has(&keys[0]));

        let remaining: HashSet<String> = cache.keys().into_iter().collect();
        let expected: HashSet<String> = keys[1..].iter().cloned().collect();
        prop_assert_eq!(remaining, expected);
    }

    // A key touched by get is not evicted until it is again least recently used.
    #[test]
    fn prop_get_protects_from_eviction(
        keys in prop::collection::hash_set("[a-z]{1,12}", 3..16),
        touched in any::<prop::sample::Index>()
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len();
        let cache: Cache<String, u32> = Cache::builder(capacity).build().unwrap();
        for (i, key) in keys.iter().enumerate() {
            cache.set(key.clone(), i as u32);
        }

        let touched = touched.get(&keys).clone();
        prop_assert!(cache.get(&touched).is_some());

        // Every other key gets pushed out before the touched one
        for i in 0..capacity - 1 {
            cache.set(format!("new-{}", i), 0);
            prop_assert!(cache.has(&touched));
        }
        cache.set("new-final".to_string(), 0);
        prop_assert!(!cache.has(&touched));
    }
}
