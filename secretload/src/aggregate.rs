use serde::{Deserialize, Serialize};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Lock-free collector for the outcome of every task in a stress run.
///
/// `OutcomeAggregator` keeps three independent counters: attempts, failures and the
/// cumulative elapsed time of all tasks. Each `record_*` method is a single atomic
/// add, so any number of tasks may call them concurrently through a shared reference
/// (usually an `Arc<OutcomeAggregator>`) without further synchronization.
///
/// Like the rest of the aggregation layer, the aggregator stores raw counts
/// only. Derived statistics such as the average task duration belong in a
/// [`crate::report::StressReport`].
///
/// # Consistency
///
/// The three counters are updated independently. A [`snapshot`](Self::snapshot) taken
/// while tasks are still running may observe an attempt whose failure or duration has
/// not been recorded yet. The snapshot is only a faithful summary once every task has
/// finished, which the dispatcher guarantees by draining the pool before reading it.
#[derive(Debug, Default)]
pub struct OutcomeAggregator {
    attempted: AtomicU64,
    failed: AtomicU64,
    // Nanoseconds. Wraps after ~584 years of cumulative task time.
    total_nanos: AtomicU64,
}

impl OutcomeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one task that started its remote operation.
    pub fn record_attempt(&self) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one task whose remote operation (or client setup) failed.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the wall time one task spent in its remote operation.
    pub fn record_duration(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Read all three counters.
    ///
    /// See the type level docs: this is not a consistent view while tasks are active.
    pub fn snapshot(&self) -> AggregatedMetrics {
        AggregatedMetrics {
            attempted: self.attempted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// Plain-data copy of the [`OutcomeAggregator`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub attempted: u64,
    pub failed: u64,
    pub total_duration: Duration,
}

impl AggregatedMetrics {
    /// Attempts that did not fail.
    pub fn succeeded(&self) -> u64 {
        self.attempted.saturating_sub(self.failed)
    }
}
