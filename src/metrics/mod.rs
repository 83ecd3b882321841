//! Operation Metrics
//!
//! Counters describing how a [`ConcurrentMap`](crate::ConcurrentMap) is being used:
//! how many operations found what they were looking for, how often the lock was
//! already held when an operation arrived, and roughly how much memory the
//! stored entries occupy.
//!
//! Recording is a handful of relaxed atomic increments and can be switched off
//! per container through [`MetricsCollector::set_metrics_enabled`].

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Point-in-time view of a container's operation counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PerformanceMetrics {
    /// Total number of operations recorded
    pub total_operations: u64,
    /// Operations that hit (found, inserted, replaced or removed an entry)
    pub successful_operations: u64,
    /// Operations that missed or were rejected
    pub failed_operations: u64,
    /// Operations that found the lock already held and had to wait
    pub contended_operations: u64,
    /// Average duration of successful operations in nanoseconds
    pub avg_operation_time_ns: u64,
    /// Slowest successful operation in nanoseconds
    pub max_operation_time_ns: u64,
    /// Estimated bytes held by stored entries
    pub memory_usage_bytes: usize,
    /// Highest memory estimate observed
    pub peak_memory_usage_bytes: usize,
}

impl PerformanceMetrics {
    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        Self::percentage(self.successful_operations, self.total_operations)
    }

    /// Contention rate as a percentage
    pub fn contention_rate(&self) -> f64 {
        Self::percentage(self.contended_operations, self.total_operations)
    }

    /// Failure rate as a percentage
    pub fn failure_rate(&self) -> f64 {
        Self::percentage(self.failed_operations, self.total_operations)
    }

    /// Average operation time
    pub fn avg_operation_time(&self) -> Duration {
        Duration::from_nanos(self.avg_operation_time_ns)
    }

    /// Maximum operation time
    pub fn max_operation_time(&self) -> Duration {
        Duration::from_nanos(self.max_operation_time_ns)
    }

    fn percentage(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

/// Lock-free counters backing [`PerformanceMetrics`]
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    total_operations: AtomicU64,
    successful_operations: AtomicU64,
    failed_operations: AtomicU64,
    contended_operations: AtomicU64,
    total_time_ns: AtomicU64,
    max_time_ns: AtomicU64,
    memory_usage: AtomicUsize,
    peak_memory_usage: AtomicUsize,
}

impl AtomicMetrics {
    /// Record a successful operation with its duration
    pub fn record_success(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.successful_operations.fetch_add(1, Ordering::Relaxed);
        self.total_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        self.max_time_ns.fetch_max(duration_ns, Ordering::Relaxed);
    }

    /// Record a missed or rejected operation
    pub fn record_failure(&self) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.failed_operations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that an operation had to wait for the lock
    pub fn record_contention(&self) {
        self.contended_operations.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the memory estimate, tracking the peak
    pub fn update_memory_usage(&self, usage: usize) {
        self.memory_usage.store(usage, Ordering::Relaxed);
        self.peak_memory_usage.fetch_max(usage, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> PerformanceMetrics {
        let total_operations = self.total_operations.load(Ordering::Relaxed);
        let successful_operations = self.successful_operations.load(Ordering::Relaxed);
        let total_time = self.total_time_ns.load(Ordering::Relaxed);

        PerformanceMetrics {
            total_operations,
            successful_operations,
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
            contended_operations: self.contended_operations.load(Ordering::Relaxed),
            avg_operation_time_ns: if successful_operations > 0 {
                total_time / successful_operations
            } else {
                0
            },
            max_operation_time_ns: self.max_time_ns.load(Ordering::Relaxed),
            memory_usage_bytes: self.memory_usage.load(Ordering::Relaxed),
            peak_memory_usage_bytes: self.peak_memory_usage.load(Ordering::Relaxed),
        }
    }

    /// Reset the operation counters
    ///
    /// Memory usage is left alone since it reflects current contents.
    pub fn reset(&self) {
        self.total_operations.store(0, Ordering::Relaxed);
        self.successful_operations.store(0, Ordering::Relaxed);
        self.failed_operations.store(0, Ordering::Relaxed);
        self.contended_operations.store(0, Ordering::Relaxed);
        self.total_time_ns.store(0, Ordering::Relaxed);
        self.max_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Containers that expose [`PerformanceMetrics`]
pub trait MetricsCollector {
    /// Current metrics snapshot
    fn metrics(&self) -> PerformanceMetrics;

    /// Reset all operation counters
    fn reset_metrics(&self);

    /// Enable or disable metrics collection
    fn set_metrics_enabled(&self, enabled: bool);

    /// Whether metrics collection is enabled
    fn is_metrics_enabled(&self) -> bool;
}
