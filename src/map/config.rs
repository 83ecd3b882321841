//! Construction settings for [`ConcurrentMap`](super::ConcurrentMap)

/// Initial capacity hint used when none is given, and after `clear`
pub const DEFAULT_CAPACITY: usize = 31;

/// Configuration for a [`ConcurrentMap`](super::ConcurrentMap)
///
/// The capacity only affects pre-allocation; any value, including zero, yields a
/// correct container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Number of entries to pre-allocate room for
    pub initial_capacity: usize,

    /// Record operation metrics
    pub enable_metrics: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            enable_metrics: true,
        }
    }
}

impl MapConfig {
    /// Default configuration with a specific capacity hint
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Default configuration with metrics collection switched off
    pub fn without_metrics() -> Self {
        Self {
            enable_metrics: false,
            ..Self::default()
        }
    }

    /// Set the capacity hint
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Enable or disable metrics collection
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.enable_metrics = enabled;
        self
    }
}
