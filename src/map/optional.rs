//! Reads through a map that may not exist yet

use super::concurrent::ConcurrentMap;
use super::entry::Entry;
use core::hash::{BuildHasher, Hash};

/// Snapshot reads on an optional map
///
/// Code holding an `Option<&ConcurrentMap>` (a lazily created map, say) can
/// read through it without matching first; an absent map behaves as an empty
/// one.
///
/// # Examples
///
/// ```rust
/// use rwmap::{OptionalMap, StringMap};
///
/// let missing: Option<&StringMap<i32>> = None;
/// assert_eq!(missing.count(), 0);
/// assert!(missing.keys().is_empty());
///
/// let map = StringMap::new();
/// map.try_add("a".to_string(), 1);
/// assert_eq!(Some(&map).count(), 1);
/// ```
pub trait OptionalMap<K, V> {
    /// Number of entries, `0` when there is no map
    fn count(&self) -> usize;

    /// Snapshot of keys, empty when there is no map
    fn keys(&self) -> Vec<K>;

    /// Snapshot of values, empty when there is no map
    fn values(&self) -> Vec<V>;

    /// Snapshot of entries, empty when there is no map
    fn to_entries(&self) -> Vec<Entry<K, V>>;
}

impl<K, V, S> OptionalMap<K, V> for Option<&ConcurrentMap<K, V, S>>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn count(&self) -> usize {
        match self {
            Some(map) => map.len(),
            None => 0,
        }
    }

    fn keys(&self) -> Vec<K> {
        match self {
            Some(map) => map.keys(),
            None => Vec::new(),
        }
    }

    fn values(&self) -> Vec<V> {
        match self {
            Some(map) => map.values(),
            None => Vec::new(),
        }
    }

    fn to_entries(&self) -> Vec<Entry<K, V>> {
        match self {
            Some(map) => map.to_entries(),
            None => Vec::new(),
        }
    }
}
