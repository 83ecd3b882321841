//! Concurrent Map Implementation
//!
//! This module implements a key-value container guarded by a single reader/writer
//! lock. Pure reads share the lock; every operation that may write holds the lock
//! exclusively for its whole check-then-act sequence, so compound operations such
//! as [`ConcurrentMap::get_or_add`] and [`ConcurrentMap::try_replace`] are atomic.
//!
//! ## Design
//!
//! The map uses:
//! - One `parking_lot::RwLock` around a plain `HashMap`
//! - Scoped guards, released on every exit path including unwinding out of a
//!   caller-supplied closure (`parking_lot` locks never poison)
//! - Exact-length snapshots for `keys`, `values` and `to_entries`
//!
//! ## Callbacks
//!
//! Factories, update functions and comparers run while the exclusive lock is
//! held and are invoked at most once per call. They must not call back into the
//! same map; the lock is not reentrant.
//!
//! ## Example
//!
//! ```rust
//! use rwmap::ConcurrentMap;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let map = Arc::new(ConcurrentMap::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|id| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || map.get_or_add("shared".to_string(), |_| id))
//!     })
//!     .collect();
//!
//! let seen: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//!
//! // Exactly one factory won; everyone observed its value
//! assert!(seen.iter().all(|v| *v == seen[0]));
//! assert_eq!(map.len(), 1);
//! ```

use super::config::{MapConfig, DEFAULT_CAPACITY};
use super::entry::Entry;
use crate::metrics::{AtomicMetrics, MetricsCollector, PerformanceMetrics};
use crate::{Error, Result};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::hash_map::{self, HashMap, RandomState};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

type Items<K, V, S> = HashMap<K, Entry<K, V>, S>;

/// A thread-safe map with atomic compound operations
///
/// All operations take `&self`; share the map between threads with an `Arc`.
///
/// # Type Parameters
///
/// * `K` - The key type, must implement `Hash + Eq + Clone`
/// * `V` - The value type; operations that hand values back require `Clone`
/// * `S` - The hash builder, `RandomState` unless chosen otherwise
///
/// # Examples
///
/// ```rust
/// use rwmap::ConcurrentMap;
///
/// let map = ConcurrentMap::new();
/// assert!(map.try_add("a".to_string(), 1));
/// assert!(!map.try_add("a".to_string(), 2));
/// assert_eq!(map.try_get_value("a"), Some(1));
/// ```
#[derive(Debug)]
pub struct ConcurrentMap<K, V, S = RandomState> {
    // Mapping from key to entry; the only shared state
    items: RwLock<Items<K, V, S>>,

    // Operation counters
    metrics: AtomicMetrics,

    // Metrics switch
    metrics_enabled: AtomicBool,
}

/// A [`ConcurrentMap`] keyed by `String`
pub type StringMap<V> = ConcurrentMap<String, V>;

/// A [`ConcurrentMap`] using the Fx hash function
///
/// Faster than the default hasher for short keys but not resistant to
/// collision attacks.
pub type FxConcurrentMap<K, V> = ConcurrentMap<K, V, fxhash::FxBuildHasher>;

impl<K, V> ConcurrentMap<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a new map with the default capacity hint of 31 entries
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::StringMap;
    ///
    /// let map: StringMap<u64> = StringMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Create a new map pre-allocated for `capacity` entries
    ///
    /// The capacity is only a hint; it never affects behavior.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(MapConfig::new(capacity))
    }

    /// Create a new map from a [`MapConfig`]
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::{ConcurrentMap, MapConfig};
    /// use rwmap::metrics::MetricsCollector;
    ///
    /// let map: ConcurrentMap<String, i32> = ConcurrentMap::with_config(MapConfig::without_metrics());
    /// assert!(!map.is_metrics_enabled());
    /// ```
    pub fn with_config(config: MapConfig) -> Self {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Create a new map with a capacity hint and a custom hash builder
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_config_and_hasher(MapConfig::new(capacity), hash_builder)
    }

    /// Create a new map from a [`MapConfig`] and a custom hash builder
    pub fn with_config_and_hasher(config: MapConfig, hash_builder: S) -> Self {
        debug!(
            capacity = config.initial_capacity,
            metrics = config.enable_metrics,
            "creating concurrent map"
        );

        Self {
            items: RwLock::new(HashMap::with_capacity_and_hasher(
                config.initial_capacity,
                hash_builder,
            )),
            metrics: AtomicMetrics::default(),
            metrics_enabled: AtomicBool::new(config.enable_metrics),
        }
    }

    /// Get the number of entries in the map
    ///
    /// Taken under the shared lock, so the count is consistent with any snapshot
    /// a concurrent reader takes at the same instant.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.try_add("a".to_string(), 1);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries the map can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.read().capacity()
    }

    /// Snapshot of every key currently present
    ///
    /// The result has exactly [`len`](Self::len) elements as of one instant.
    /// Order is unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.try_add("a".to_string(), 1);
    /// map.try_add("b".to_string(), 2);
    ///
    /// let mut keys = map.keys();
    /// keys.sort();
    /// assert_eq!(keys, ["a", "b"]);
    /// ```
    pub fn keys(&self) -> Vec<K> {
        let start = self.start();
        let keys: Vec<K> = self.read().keys().cloned().collect();
        self.finish(start, true);
        keys
    }

    /// Snapshot of every stored value
    ///
    /// Values are cloned; store an `Arc` to share payloads instead of copying them.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let start = self.start();
        let values: Vec<V> = self.read().values().map(|entry| entry.value().clone()).collect();
        self.finish(start, true);
        values
    }

    /// Snapshot copy of every stored [`Entry`]
    ///
    /// The returned entries are detached from the map.
    pub fn to_entries(&self) -> Vec<Entry<K, V>>
    where
        V: Clone,
    {
        let start = self.start();
        let entries: Vec<Entry<K, V>> = self.read().values().cloned().collect();
        self.finish(start, true);
        entries
    }

    /// Insert a batch of key-value pairs under one exclusive lock acquisition
    ///
    /// Existing keys are overwritten. Every inserted entry's insertion index is
    /// derived from the map size read once when the lock is taken, plus the
    /// pair's position in the batch.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.add_range(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn add_range<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        // Gather first so the caller's iterator never runs under the lock
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        let count = pairs.len();

        let start = self.start();
        let mut items = self.write();
        let base = items.len();
        items.reserve(count);
        for (offset, (key, value)) in pairs.into_iter().enumerate() {
            items.insert(key.clone(), Entry::new(key, value, base + offset));
        }
        let len = items.len();
        drop(items);

        debug!(inserted = count, len, "applied batch insert");
        self.track_memory(len);
        self.finish(start, true);
    }

    /// Insert `value` if `key` is absent, otherwise store `update(&key)`
    ///
    /// The existing value is not passed to `update`, and the supplied `value`
    /// is dropped when the key already exists. Check and write happen under one
    /// exclusive acquisition.
    ///
    /// # Returns
    ///
    /// The value now stored for `key`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.add_or_update("x".to_string(), 10, |_| 99), 10);
    /// assert_eq!(map.add_or_update("x".to_string(), 20, |_| 99), 99);
    /// assert_eq!(map.try_get_value("x"), Some(99));
    /// ```
    pub fn add_or_update<F>(&self, key: K, value: V, update: F) -> V
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let start = self.start();
        let mut items = self.write();
        let stored = Self::add_or_update_locked(&mut items, key, value, update);
        let len = items.len();
        drop(items);

        self.track_memory(len);
        self.finish(start, true);
        stored
    }

    /// Return the value for `key`, inserting `factory(&key)` if it is absent
    ///
    /// When several threads race on the same absent key exactly one factory
    /// runs; the others return the value it produced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// assert_eq!(map.get_or_add("a".to_string(), |key| key.len()), 1);
    /// assert_eq!(map.get_or_add("a".to_string(), |_| unreachable!()), 1);
    /// ```
    pub fn get_or_add<F>(&self, key: K, factory: F) -> V
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let start = self.start();
        let mut items = self.write();
        let (value, inserted) = Self::get_or_add_locked(&mut items, key, factory);
        let len = items.len();
        drop(items);

        if inserted {
            self.track_memory(len);
        }
        self.finish(start, true);
        value
    }

    /// Insert `value` only if `key` is absent
    ///
    /// # Returns
    ///
    /// * `true` if the pair was inserted
    /// * `false` if the key was already present; the map is left untouched
    pub fn try_add(&self, key: K, value: V) -> bool {
        let start = self.start();
        let mut items = self.write();
        let inserted = Self::try_add_locked(&mut items, key, value);
        let len = items.len();
        drop(items);

        if inserted {
            self.track_memory(len);
        }
        self.finish(start, inserted);
        inserted
    }

    /// Look up a copy of the value stored for `key`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.try_add("a".to_string(), 1);
    /// assert_eq!(map.try_get_value("a"), Some(1));
    /// assert_eq!(map.try_get_value("c"), None);
    /// ```
    pub fn try_get_value<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let start = self.start();
        let value = self.read().get(key).map(|entry| entry.value().clone());
        self.finish(start, value.is_some());
        value
    }

    /// Evaluate `f` against the value stored for `key` without cloning it
    ///
    /// `f` runs under the shared lock.
    pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        let start = self.start();
        let result = self.read().get(key).map(|entry| f(entry.value()));
        self.finish(start, result.is_some());
        result
    }

    /// Replace the stored value for `key` if `comparer` accepts the current one
    ///
    /// The replacement is written into the stored entry, so subsequent reads
    /// observe it. When `key` is absent `comparer` is not called.
    ///
    /// # Returns
    ///
    /// * `true` if the value was replaced
    /// * `false` if the key is absent or `comparer` returned `false`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rwmap::ConcurrentMap;
    ///
    /// let map = ConcurrentMap::new();
    /// map.try_add("k".to_string(), 1);
    /// assert!(!map.try_replace("k", 5, |current| *current == 2));
    /// assert!(map.try_replace("k", 5, |current| *current == 1));
    /// assert_eq!(map.try_get_value("k"), Some(5));
    /// ```
    pub fn try_replace<Q, F>(&self, key: &Q, new_value: V, comparer: F) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> bool,
    {
        let start = self.start();
        let mut items = self.write();
        let replaced = match items.get_mut(key) {
            Some(entry) => {
                if comparer(entry.value()) {
                    entry.set_value(new_value);
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        drop(items);

        self.finish(start, replaced);
        replaced
    }

    /// Check whether `key` is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let start = self.start();
        let found = self.read().contains_key(key);
        self.finish(start, found);
        found
    }

    /// Remove the entry for `key`
    ///
    /// A no-op when the key is absent.
    ///
    /// # Returns
    ///
    /// * `Some(value)` if the key existed and was removed
    /// * `None` if the key did not exist
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let start = self.start();
        let mut items = self.write();
        let removed = Self::remove_locked(&mut items, key);
        let len = items.len();
        drop(items);

        if removed.is_some() {
            self.track_memory(len);
        }
        self.finish(start, removed.is_some());
        removed
    }

    /// Discard every entry
    ///
    /// The map keeps its identity, lock and hasher and is left with the default
    /// capacity hint.
    pub fn clear(&self) {
        let start = self.start();
        let mut items = self.write();
        let discarded = items.len();
        items.clear();
        items.shrink_to(DEFAULT_CAPACITY);
        items.reserve(DEFAULT_CAPACITY);
        drop(items);

        debug!(discarded, "cleared concurrent map");
        self.track_memory(0);
        self.finish(start, true);
    }

    /// [`try_get_value`](Self::try_get_value) waiting at most `timeout` for the lock
    pub fn try_get_value_timeout<Q>(&self, key: &Q, timeout: Duration) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        let start = self.start();
        let value = self.read_for(timeout)?.get(key).map(|entry| entry.value().clone());
        self.finish(start, value.is_some());
        Ok(value)
    }

    /// [`try_add`](Self::try_add) waiting at most `timeout` for the lock
    pub fn try_add_timeout(&self, key: K, value: V, timeout: Duration) -> Result<bool> {
        let start = self.start();
        let mut items = self.write_for(timeout)?;
        let inserted = Self::try_add_locked(&mut items, key, value);
        let len = items.len();
        drop(items);

        if inserted {
            self.track_memory(len);
        }
        self.finish(start, inserted);
        Ok(inserted)
    }

    /// [`get_or_add`](Self::get_or_add) waiting at most `timeout` for the lock
    ///
    /// `factory` is not called when the lock cannot be acquired in time.
    pub fn get_or_add_timeout<F>(&self, key: K, factory: F, timeout: Duration) -> Result<V>
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let start = self.start();
        let mut items = self.write_for(timeout)?;
        let (value, inserted) = Self::get_or_add_locked(&mut items, key, factory);
        let len = items.len();
        drop(items);

        if inserted {
            self.track_memory(len);
        }
        self.finish(start, true);
        Ok(value)
    }

    /// [`add_or_update`](Self::add_or_update) waiting at most `timeout` for the lock
    pub fn add_or_update_timeout<F>(&self, key: K, value: V, update: F, timeout: Duration) -> Result<V>
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let start = self.start();
        let mut items = self.write_for(timeout)?;
        let stored = Self::add_or_update_locked(&mut items, key, value, update);
        let len = items.len();
        drop(items);

        self.track_memory(len);
        self.finish(start, true);
        Ok(stored)
    }

    /// [`remove`](Self::remove) waiting at most `timeout` for the lock
    pub fn remove_timeout<Q>(&self, key: &Q, timeout: Duration) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let start = self.start();
        let mut items = self.write_for(timeout)?;
        let removed = Self::remove_locked(&mut items, key);
        let len = items.len();
        drop(items);

        if removed.is_some() {
            self.track_memory(len);
        }
        self.finish(start, removed.is_some());
        Ok(removed)
    }

    // Operations on an already locked mapping

    fn add_or_update_locked<F>(items: &mut Items<K, V, S>, key: K, value: V, update: F) -> V
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let index = items.len();
        match items.entry(key) {
            hash_map::Entry::Occupied(mut occupied) => {
                let replacement = update(occupied.key());
                occupied.get_mut().set_value(replacement);
                occupied.get().value().clone()
            }
            hash_map::Entry::Vacant(vacant) => {
                let key = vacant.key().clone();
                vacant.insert(Entry::new(key, value, index)).value().clone()
            }
        }
    }

    fn get_or_add_locked<F>(items: &mut Items<K, V, S>, key: K, factory: F) -> (V, bool)
    where
        V: Clone,
        F: FnOnce(&K) -> V,
    {
        let index = items.len();
        match items.entry(key) {
            hash_map::Entry::Occupied(occupied) => (occupied.get().value().clone(), false),
            hash_map::Entry::Vacant(vacant) => {
                let value = factory(vacant.key());
                let key = vacant.key().clone();
                (vacant.insert(Entry::new(key, value, index)).value().clone(), true)
            }
        }
    }

    fn try_add_locked(items: &mut Items<K, V, S>, key: K, value: V) -> bool {
        let index = items.len();
        match items.entry(key) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(vacant) => {
                let key = vacant.key().clone();
                vacant.insert(Entry::new(key, value, index));
                true
            }
        }
    }

    fn remove_locked<Q>(items: &mut Items<K, V, S>, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        items.remove(key).map(|entry| entry.into_parts().1)
    }

    // Lock acquisition

    fn read(&self) -> RwLockReadGuard<'_, Items<K, V, S>> {
        match self.items.try_read() {
            Some(guard) => guard,
            None => {
                self.note_contention();
                self.items.read()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Items<K, V, S>> {
        match self.items.try_write() {
            Some(guard) => guard,
            None => {
                self.note_contention();
                self.items.write()
            }
        }
    }

    fn read_for(&self, timeout: Duration) -> Result<RwLockReadGuard<'_, Items<K, V, S>>> {
        if let Some(guard) = self.items.try_read() {
            return Ok(guard);
        }
        self.note_contention();
        self.items
            .try_read_for(timeout)
            .ok_or_else(|| self.timed_out(timeout))
    }

    fn write_for(&self, timeout: Duration) -> Result<RwLockWriteGuard<'_, Items<K, V, S>>> {
        if let Some(guard) = self.items.try_write() {
            return Ok(guard);
        }
        self.note_contention();
        self.items
            .try_write_for(timeout)
            .ok_or_else(|| self.timed_out(timeout))
    }

    fn timed_out(&self, timeout: Duration) -> Error {
        warn!(?timeout, "gave up waiting for map lock");
        if self.is_metrics_enabled() {
            self.metrics.record_failure();
        }
        Error::Timeout
    }

    // Metrics bookkeeping

    fn note_contention(&self) {
        trace!("map lock contended");
        if self.is_metrics_enabled() {
            self.metrics.record_contention();
        }
    }

    fn start(&self) -> Option<Instant> {
        self.is_metrics_enabled().then(Instant::now)
    }

    fn finish(&self, start: Option<Instant>, success: bool) {
        if let Some(start) = start {
            if success {
                self.metrics.record_success(start.elapsed());
            } else {
                self.metrics.record_failure();
            }
        }
    }

    fn track_memory(&self, len: usize) {
        if self.is_metrics_enabled() {
            self.metrics
                .update_memory_usage(len * core::mem::size_of::<(K, Entry<K, V>)>());
        }
    }
}

impl<K, V, S> Default for ConcurrentMap<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_config_and_hasher(MapConfig::default(), S::default())
    }
}

impl<K, V, S> FromIterator<(K, V)> for ConcurrentMap<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::default();
        map.add_range(iter);
        map
    }
}

impl<K, V, S> MetricsCollector for ConcurrentMap<K, V, S> {
    fn metrics(&self) -> PerformanceMetrics {
        self.metrics.snapshot()
    }

    fn reset_metrics(&self) {
        self.metrics.reset();
    }

    fn set_metrics_enabled(&self, enabled: bool) {
        self.metrics_enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_metrics_enabled(&self) -> bool {
        self.metrics_enabled.load(Ordering::Relaxed)
    }
}
