//! Retention run metrics.
//!
//! Thread-safe counters for monitoring the manager. Internal observability
//! only; the persisted rule bookkeeping is the external liveness signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Thread-safe metrics for tracking retention runs
#[derive(Debug, Clone, Default)]
pub struct RetentionMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Number of completed cycles
    cycles_completed: AtomicUsize,
    /// Number of rules processed to completion
    rules_processed: AtomicUsize,
    /// Number of elements deleted
    elements_deleted: AtomicUsize,
    /// Number of elements the deletion guard refused
    elements_skipped: AtomicUsize,
    /// Number of elements found already deleted by another actor
    elements_already_absent: AtomicUsize,
    /// Number of element deletions that failed
    deletion_failures: AtomicUsize,
    /// Total rule-processing duration in milliseconds
    total_duration_ms: AtomicU64,
}

impl RetentionMetrics {
    /// Create a new metrics tracker
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle_completed(&self) {
        self.inner.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rule_processed(&self) {
        self.inner.rules_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.inner.elements_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.inner.elements_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_already_absent(&self) {
        self.inner
            .elements_already_absent
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.deletion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duration_ms(&self, duration_ms: u64) {
        self.inner
            .total_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn cycles_completed(&self) -> usize {
        self.inner.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn rules_processed(&self) -> usize {
        self.inner.rules_processed.load(Ordering::Relaxed)
    }

    pub fn elements_deleted(&self) -> usize {
        self.inner.elements_deleted.load(Ordering::Relaxed)
    }

    pub fn elements_skipped(&self) -> usize {
        self.inner.elements_skipped.load(Ordering::Relaxed)
    }

    pub fn elements_already_absent(&self) -> usize {
        self.inner.elements_already_absent.load(Ordering::Relaxed)
    }

    pub fn deletion_failures(&self) -> usize {
        self.inner.deletion_failures.load(Ordering::Relaxed)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.inner.total_duration_ms.load(Ordering::Relaxed)
    }
}
