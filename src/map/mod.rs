//! Map implementations
//!
//! This module provides the [`ConcurrentMap`] container and its supporting types.
//!
//! ## Contents
//!
//! - [`ConcurrentMap`]: key-value container behind one reader/writer lock
//! - [`Entry`]: the record stored per key, returned by snapshots
//! - [`MapConfig`]: construction settings
//! - [`OptionalMap`]: empty-by-default reads through `Option<&ConcurrentMap>`
//!
//! ## Locking
//!
//! - Reads (`contains_key`, `try_get_value`, `len`, `keys`, `values`,
//!   `to_entries`) share the lock
//! - Everything that may write holds the lock exclusively for the whole
//!   operation, including the conditional ones (`get_or_add`, `add_or_update`,
//!   `try_add`, `try_replace`)

pub mod concurrent;
pub mod config;
pub mod entry;
pub mod optional;

pub use self::concurrent::{ConcurrentMap, FxConcurrentMap, StringMap};
pub use self::config::{MapConfig, DEFAULT_CAPACITY};
pub use self::entry::Entry;
pub use self::optional::OptionalMap;


#[cfg(test)]
mod proptests;

#[cfg(test)]
mod loom_tests;
