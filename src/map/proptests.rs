//! Property-based tests for ConcurrentMap using proptest
//!
//! Random operation sequences are applied both to a `ConcurrentMap` and to a
//! plain `HashMap` model; after every step the two must agree.

use super::*;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone)]
enum Op {
    TryAdd(u8, i32),
    GetOrAdd(u8, i32),
    AddOrUpdate(u8, i32, i32),
    TryReplace(u8, i32, bool),
    Remove(u8),
    AddRange(Vec<(u8, i32)>),
    Clear,
}

fn key(k: u8) -> String {
    format!("k{}", k % 16)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::TryAdd(k, v)),
        3 => (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::GetOrAdd(k, v)),
        3 => (any::<u8>(), any::<i32>(), any::<i32>()).prop_map(|(k, v, u)| Op::AddOrUpdate(k, v, u)),
        3 => (any::<u8>(), any::<i32>(), any::<bool>()).prop_map(|(k, v, b)| Op::TryReplace(k, v, b)),
        2 => any::<u8>().prop_map(Op::Remove),
        1 => prop::collection::vec((any::<u8>(), any::<i32>()), 0..8).prop_map(Op::AddRange),
        1 => Just(Op::Clear),
    ]
}

/// Property: the map behaves like a `HashMap` under sequential use
mod model_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_matches_hashmap_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let map: StringMap<i32> = StringMap::new();
            let mut model: HashMap<String, i32> = HashMap::new();

            for op in ops {
                match op {
                    Op::TryAdd(k, v) => {
                        let expected = !model.contains_key(&key(k));
                        if expected {
                            model.insert(key(k), v);
                        }
                        prop_assert_eq!(map.try_add(key(k), v), expected);
                    }
                    Op::GetOrAdd(k, v) => {
                        let expected = *model.entry(key(k)).or_insert(v);
                        prop_assert_eq!(map.get_or_add(key(k), |_| v), expected);
                    }
                    Op::AddOrUpdate(k, v, u) => {
                        let expected = if model.contains_key(&key(k)) { u } else { v };
                        model.insert(key(k), expected);
                        prop_assert_eq!(map.add_or_update(key(k), v, |_| u), expected);
                    }
                    Op::TryReplace(k, v, accept) => {
                        let expected = accept && model.contains_key(&key(k));
                        if expected {
                            model.insert(key(k), v);
                        }
                        prop_assert_eq!(map.try_replace(key(k).as_str(), v, |_| accept), expected);
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(map.remove(key(k).as_str()), model.remove(&key(k)));
                    }
                    Op::AddRange(pairs) => {
                        let pairs: Vec<(String, i32)> =
                            pairs.into_iter().map(|(k, v)| (key(k), v)).collect();
                        model.extend(pairs.iter().cloned());
                        map.add_range(pairs);
                    }
                    Op::Clear => {
                        model.clear();
                        map.clear();
                    }
                }

                prop_assert_eq!(map.len(), model.len());
            }

            let mut keys = map.keys();
            keys.sort();
            let mut model_keys: Vec<String> = model.keys().cloned().collect();
            model_keys.sort();
            prop_assert_eq!(keys, model_keys);

            for entry in map.to_entries() {
                prop_assert_eq!(model.get(entry.key()), Some(entry.value()));
            }
        }

        #[test]
        fn test_remove_absent_leaves_map_unchanged(
            present in prop::collection::hash_map("[a-z]{1,4}", any::<i32>(), 0..20),
            absent in "[A-Z]{1,4}"
        ) {
            let map: StringMap<i32> = present.clone().into_iter().collect();

            prop_assert_eq!(map.remove(absent.as_str()), None);
            prop_assert_eq!(map.len(), present.len());
            for (k, v) in &present {
                prop_assert_eq!(map.try_get_value(k.as_str()), Some(*v));
            }
        }

        #[test]
        fn test_clear_forgets_every_key(
            present in prop::collection::vec(("[a-z]{1,6}", any::<i32>()), 0..50)
        ) {
            let map: StringMap<i32> = StringMap::with_capacity(0);
            map.add_range(present.clone());
            map.clear();

            prop_assert_eq!(map.len(), 0);
            for (k, _) in &present {
                prop_assert!(!map.contains_key(k.as_str()));
            }
        }
    }
}

/// Property: concurrent get_or_add calls agree on one value per key
mod concurrent_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_concurrent_get_or_add_agrees(
            num_threads in 2usize..8,
            num_keys in 1usize..20
        ) {
            let map: Arc<StringMap<usize>> = Arc::new(StringMap::new());
            let mut handles = vec![];

            for thread_id in 0..num_threads {
                let map = Arc::clone(&map);
                let handle = thread::spawn(move || {
                    (0..num_keys)
                        .map(|k| map.get_or_add(format!("key_{}", k), |_| thread_id))
                        .collect::<Vec<_>>()
                });
                handles.push(handle);
            }

            let results: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            prop_assert_eq!(map.len(), num_keys);
            for k in 0..num_keys {
                let stored = map.try_get_value(format!("key_{}", k).as_str()).unwrap();
                for observed in &results {
                    prop_assert_eq!(observed[k], stored);
                }
            }
        }
    }
}
