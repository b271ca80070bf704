//! Counters for scheduled sync runs
//!
//! ## Design
//! - **SeqCst ordering** for the run-time total and count (used together for
//!   the average), Relaxed for independent counters
//! - **Microsecond storage** for durations, reporting helpers convert to ms

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dealsync_core::SyncReport;
use dealsync_domain::ErrorKind;

use crate::observability::{MetricsError, MetricsResult};

/// Counters for scheduled sync runs.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    invocations: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    timeouts: AtomicUsize,
    deals_fetched: AtomicU64,
    rows_inserted: AtomicU64,
    rows_updated: AtomicU64,
    rows_deleted: AtomicU64,
    total_run_time_micros: AtomicU64,
    last_run_time_micros: AtomicU64,
    timed_runs: AtomicUsize,
}

/// Point-in-time copy of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncMetricsSnapshot {
    /// Runs started
    pub invocations: usize,
    /// Runs that committed
    pub succeeded: usize,
    /// Runs that failed outside the lock check
    pub failed: usize,
    /// Runs refused by the run lock
    pub skipped: usize,
    /// Runs abandoned at the job timeout
    pub timeouts: usize,
    /// Deals received, duplicates included
    pub deals_fetched: u64,
    /// Rows inserted
    pub rows_inserted: u64,
    /// Rows overwritten
    pub rows_updated: u64,
    /// Rows removed
    pub rows_deleted: u64,
}

impl SyncMetrics {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler tick fired (or a startup run began).
    pub fn record_invocation(&self) -> MetricsResult<()> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// A run finished; its row counts are added to the totals.
    pub fn record_success(&self, report: &SyncReport) -> MetricsResult<()> {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.deals_fetched.fetch_add(as_u64(report.fetched), Ordering::Relaxed);
        self.rows_inserted.fetch_add(as_u64(report.inserted), Ordering::Relaxed);
        self.rows_updated.fetch_add(as_u64(report.updated), Ordering::Relaxed);
        self.rows_deleted.fetch_add(as_u64(report.deleted), Ordering::Relaxed);
        Ok(())
    }

    /// A run failed. Lock contention counts as a skip, not a failure.
    pub fn record_failure(&self, kind: ErrorKind) -> MetricsResult<()> {
        if kind == ErrorKind::Concurrency {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Count a run abandoned at the job timeout.
    pub fn record_timeout(&self) -> MetricsResult<()> {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record one run's wall time.
    pub fn record_run_time(&self, duration: Duration) -> MetricsResult<()> {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.total_run_time_micros.fetch_add(micros, Ordering::SeqCst);
        self.timed_runs.fetch_add(1, Ordering::SeqCst);
        self.last_run_time_micros.store(micros, Ordering::Relaxed);
        Ok(())
    }

    /// Average wall time of timed runs, in milliseconds.
    pub fn avg_run_time_ms(&self) -> MetricsResult<f64> {
        let total = self.total_run_time_micros.load(Ordering::SeqCst);
        let count = self.timed_runs.load(Ordering::SeqCst);

        if count == 0 {
            return Err(MetricsError::EmptyData { metric: "average run time" });
        }

        #[allow(clippy::cast_precision_loss)]
        Ok((total as f64 / count as f64) / 1_000.0)
    }

    /// Wall time of the most recent timed run.
    pub fn last_run_time_ms(&self) -> u64 {
        self.last_run_time_micros.load(Ordering::Relaxed) / 1_000
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            invocations: self.invocations.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            deals_fetched: self.deals_fetched.load(Ordering::Relaxed),
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            rows_updated: self.rows_updated.load(Ordering::Relaxed),
            rows_deleted: self.rows_deleted.load(Ordering::Relaxed),
        }
    }
}

fn as_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}
