//! # rwmap
//!
//! A thread-safe key-value container with atomic compound operations.
//!
//! ## Features
//!
//! - **Single reader/writer lock**: any number of concurrent readers, or exactly
//!   one writer
//! - **Compound operations**: `get_or_add`, `add_or_update`, `try_add` and
//!   `try_replace` check and write under one exclusive acquisition
//! - **Consistent snapshots**: `keys`, `values` and `to_entries` reflect a single
//!   instant and have exactly `len()` elements
//! - **Timed variants**: bounded waits for callers that cannot block forever
//! - **Metrics**: operation, miss and contention counters
//!
//! ## Quick Start
//!
//! ```rust
//! use rwmap::StringMap;
//!
//! let map = StringMap::new();
//! assert!(map.try_add("a".to_string(), 1));
//! assert_eq!(map.get_or_add("b".to_string(), |_| 2), 2);
//! assert_eq!(map.try_get_value("a"), Some(1));
//! assert_eq!(map.len(), 2);
//! ```
//!
//! ## Thread Safety
//!
//! Every operation takes `&self`. Share a map across threads with `Arc`;
//! closures passed to compound operations run under the exclusive lock.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for construction, batch inserts
//! and clears, `trace` for lock contention, `warn` for expired timed waits.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod map;
pub mod metrics;

pub use crate::map::{
    ConcurrentMap, Entry, FxConcurrentMap, MapConfig, OptionalMap, StringMap, DEFAULT_CAPACITY,
};

/// Error types for rwmap operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The lock could not be acquired within the requested time
    Timeout,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Timeout => write!(f, "Timed out waiting for map lock"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for rwmap operations
pub type Result<T> = core::result::Result<T, Error>;
