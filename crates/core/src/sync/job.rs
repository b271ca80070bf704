//! Sync job driver
//!
//! One invocation: take the run lock, load the catalog, fetch both deal
//! filters, normalize, reconcile. Every failure aborts the run and carries
//! the phase that failed. Nothing is retried here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use dealsync_domain::constants::{DEFAULT_JOB_NAME, DEFAULT_PAGE_SIZE, DEFAULT_WON_LOOKBACK_MONTHS};
use dealsync_domain::{Config, DealFilter, DealSyncError, ErrorKind, ReconcileStrategy};
use thiserror::Error;
use tracing::{error, info, warn};

use super::catalog::load_catalog;
use super::fetcher::DealFetcher;
use super::normalizer::normalize_all;
use super::ports::{DealSource, NegotiationStore, RunLock};
use super::reconciler::Reconciler;

/// Stage of a run, attached to every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// Acquiring the run lock
    Lock,
    /// Loading funnels and stages
    Catalog,
    /// Paging through deals
    Fetch,
    /// Mapping deals to rows
    Normalize,
    /// Writing to the store
    Reconcile,
}

dealsync_domain::impl_label_conversions!(SyncPhase {
    Lock => "lock",
    Catalog => "catalog",
    Fetch => "fetch",
    Normalize => "normalize",
    Reconcile => "reconcile",
});

/// A failed run.
#[derive(Debug, Error)]
#[error("sync failed during {phase}: {source}")]
pub struct SyncRunError {
    /// Where the run stopped
    pub phase: SyncPhase,
    /// What went wrong
    #[source]
    pub source: DealSyncError,
}

impl SyncRunError {
    /// Tag `source` with the phase it happened in.
    pub fn new(phase: SyncPhase, source: DealSyncError) -> Self {
        Self { phase, source }
    }

    /// Classification of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Deals returned by all filters, duplicates included
    pub fetched: usize,
    /// Rows inserted
    pub inserted: usize,
    /// Rows overwritten
    pub updated: usize,
    /// Rows removed
    pub deleted: usize,
    /// Wall time, lock held
    pub elapsed: Duration,
}

/// Knobs for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Run-lock key
    pub job_name: String,
    /// Deals per page
    pub page_size: u32,
    /// Reach of the recently-won view
    pub won_lookback_months: u32,
    /// Write strategy
    pub strategy: ReconcileStrategy,
}

impl SyncSettings {
    /// Settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            job_name: config.sync.job_name.clone(),
            page_size: config.crm.page_size,
            won_lookback_months: config.crm.won_lookback_months,
            strategy: config.sync.strategy,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            won_lookback_months: DEFAULT_WON_LOOKBACK_MONTHS,
            strategy: ReconcileStrategy::Diff,
        }
    }
}

/// Mirrors CRM deals into the negotiation table.
pub struct SyncJob {
    source: Arc<dyn DealSource>,
    lock: Arc<dyn RunLock>,
    fetcher: DealFetcher,
    reconciler: Reconciler,
    settings: SyncSettings,
}

impl SyncJob {
    /// Wire a job over its ports.
    pub fn new(
        source: Arc<dyn DealSource>,
        store: Arc<dyn NegotiationStore>,
        lock: Arc<dyn RunLock>,
        settings: SyncSettings,
    ) -> Self {
        let fetcher = DealFetcher::new(Arc::clone(&source), settings.page_size);
        let reconciler = Reconciler::new(store).with_strategy(settings.strategy);
        Self { source, lock, fetcher, reconciler, settings }
    }

    /// Settings this job was built with.
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run against today's date (UTC).
    pub async fn run_once(&self) -> Result<SyncReport, SyncRunError> {
        self.run_at(Utc::now().date_naive()).await
    }

    /// Run with `today` anchoring the recently-won look-back window.
    ///
    /// Fails fast with a concurrency error when another run holds the lock.
    /// The lock is released whether or not the run succeeds.
    pub async fn run_at(&self, today: NaiveDate) -> Result<SyncReport, SyncRunError> {
        let key = self.settings.job_name.as_str();

        let lease = match self.lock.try_acquire(key).await {
            Ok(true) => LockLease::new(Arc::clone(&self.lock), key),
            Ok(false) => {
                warn!(job = key, "Sync already in progress; skipping this invocation");
                return Err(SyncRunError::new(
                    SyncPhase::Lock,
                    DealSyncError::AlreadyRunning(key.to_string()),
                ));
            }
            Err(err) => return Err(SyncRunError::new(SyncPhase::Lock, err)),
        };

        let result = self.run_locked(today).await;
        lease.release().await;

        match &result {
            Ok(report) => info!(
                job = key,
                fetched = report.fetched,
                inserted = report.inserted,
                updated = report.updated,
                deleted = report.deleted,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Sync completed"
            ),
            Err(err) => error!(
                job = key,
                phase = %err.phase,
                kind = %err.kind(),
                error = %err.source,
                "Sync failed"
            ),
        }

        result
    }

    async fn run_locked(&self, today: NaiveDate) -> Result<SyncReport, SyncRunError> {
        let started = Instant::now();

        let catalog = load_catalog(self.source.as_ref())
            .await
            .map_err(|err| SyncRunError::new(SyncPhase::Catalog, err))?;

        let filters = DealFilter::standard_set(today, self.settings.won_lookback_months);
        let deals = self
            .fetcher
            .fetch_all_filters(&filters)
            .await
            .map_err(|err| SyncRunError::new(SyncPhase::Fetch, err))?;

        let negotiations = normalize_all(&deals, &catalog)
            .map_err(|err| SyncRunError::new(SyncPhase::Normalize, err))?;

        let summary = self
            .reconciler
            .reconcile(negotiations)
            .await
            .map_err(|err| SyncRunError::new(SyncPhase::Reconcile, err))?;

        Ok(SyncReport {
            fetched: deals.len(),
            inserted: summary.inserted,
            updated: summary.updated,
            deleted: summary.deleted,
            elapsed: started.elapsed(),
        })
    }
}

/// A held run lock.
///
/// Released explicitly after the run; if the run future is dropped first
/// (a scheduler timeout, say) the release is spawned on the current runtime.
struct LockLease {
    lock: Arc<dyn RunLock>,
    key: String,
    released: bool,
}

impl LockLease {
    fn new(lock: Arc<dyn RunLock>, key: &str) -> Self {
        Self { lock, key: key.to_string(), released: false }
    }

    async fn release(mut self) {
        if let Err(err) = self.lock.release(&self.key).await {
            warn!(job = %self.key, error = %err, "Failed to release run lock");
        }
        self.released = true;
    }
}

impl Drop for LockLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let lock = Arc::clone(&self.lock);
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = lock.release(&key).await {
                        warn!(job = %key, error = %err, "Failed to release abandoned run lock");
                    }
                });
            }
            Err(_) => warn!(job = %key, "Run abandoned outside a runtime; lock not released"),
        }
    }
}
