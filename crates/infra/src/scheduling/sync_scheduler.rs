//! Cron scheduler for deal sync runs.
//!
//! Triggers a [`ScheduledSync`] on a cron expression (UTC, seconds first),
//! bounds every run with a timeout and records the outcome in
//! [`SyncMetrics`]. Each `start` builds a fresh `JobScheduler`, so a stopped
//! scheduler can be started again.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dealsync_core::SyncJob;
//! use dealsync_infra::observability::metrics::SyncMetrics;
//! use dealsync_infra::scheduling::{SchedulerResult, SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(job: Arc<SyncJob>) -> SchedulerResult<()> {
//! let metrics = Arc::new(SyncMetrics::new());
//! let mut scheduler = SyncScheduler::with_config(
//!     SyncSchedulerConfig {
//!         cron_expression: "0 */15 11,14-19 * * Mon-Fri".into(),
//!         ..Default::default()
//!     },
//!     job,
//!     metrics,
//! )?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dealsync_core::{SyncJob, SyncReport, SyncRunError};
use dealsync_domain::constants::{DEFAULT_CRON, DEFAULT_JOB_TIMEOUT_SECS};
use dealsync_domain::ScheduleConfig;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::observability::metrics::SyncMetrics;
use crate::observability::MetricsResult;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Something the scheduler can run on each tick.
#[async_trait]
pub trait ScheduledSync: Send + Sync {
    /// Execute one sync.
    async fn run(&self) -> Result<SyncReport, SyncRunError>;
}

#[async_trait]
impl ScheduledSync for SyncJob {
    async fn run(&self) -> Result<SyncReport, SyncRunError> {
        self.run_once().await
    }
}

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Timeout applied to a single run.
    pub job_timeout: Duration,
    /// Run once immediately when the scheduler starts.
    pub run_on_startup: bool,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting spawned task join handles.
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_CRON.into(),
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            run_on_startup: false,
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncSchedulerConfig {
    /// Scheduler settings from the `schedule` config section; shutdown timeouts keep their defaults.
    pub fn from_schedule(schedule: &ScheduleConfig) -> Self {
        Self {
            cron_expression: schedule.cron.clone(),
            job_timeout: Duration::from_secs(schedule.job_timeout_secs),
            run_on_startup: schedule.run_on_startup,
            ..Self::default()
        }
    }
}

/// Sync scheduler with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    startup_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    metrics: Arc<SyncMetrics>,
    job: Arc<dyn ScheduledSync>,
}

impl SyncScheduler {
    /// Create a scheduler with the default configuration.
    pub fn new(
        cron_expression: String,
        job: Arc<dyn ScheduledSync>,
        metrics: Arc<SyncMetrics>,
    ) -> SchedulerResult<Self> {
        let config = SyncSchedulerConfig { cron_expression, ..SyncSchedulerConfig::default() };
        Self::with_config(config, job, metrics)
    }

    /// Create a scheduler with a custom configuration.
    ///
    /// The cron expression is validated here so a bad schedule fails at
    /// startup rather than on the first `start`.
    pub fn with_config(
        config: SyncSchedulerConfig,
        job: Arc<dyn ScheduledSync>,
        metrics: Arc<SyncMetrics>,
    ) -> SchedulerResult<Self> {
        let scheduler = Self {
            scheduler: None,
            config,
            monitor_handle: None,
            startup_handle: None,
            cancellation: CancellationToken::new(),
            metrics,
            job,
        };

        scheduler.build_sync_job()?;
        Ok(scheduler)
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = JobScheduler::new()
            .await
            .map_err(|err| SchedulerError::CreationFailed(err.to_string()))?;
        let job_definition = self.build_sync_job()?;
        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|err| SchedulerError::JobRegistrationFailed(err.to_string()))?;

        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|err| SchedulerError::StartFailed(err.to_string()))?;
        self.scheduler = Some(scheduler);

        if self.config.run_on_startup {
            let job = self.job.clone();
            let metrics = self.metrics.clone();
            let cancel = self.cancellation.clone();
            let job_timeout = self.config.job_timeout;
            self.startup_handle = Some(tokio::spawn(async move {
                execute_run(job, metrics, cancel, job_timeout).await;
            }));
        }

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Sync scheduler monitor cancelled");
        }));

        info!(job_id = %job_id, "Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for spawned tasks to finish.
    ///
    /// A run in flight is cancelled; its lock is released when it unwinds.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        if let Some(mut scheduler) = self.scheduler.take() {
            let stop_timeout = self.config.stop_timeout;
            tokio::time::timeout(stop_timeout, scheduler.shutdown())
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
                .map_err(|err| SchedulerError::StopFailed(err.to_string()))?;
        }

        for handle in [self.startup_handle.take(), self.monitor_handle.take()].into_iter().flatten() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Shared counters for this scheduler's runs.
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    fn build_sync_job(&self) -> SchedulerResult<Job> {
        let job = self.job.clone();
        let metrics = self.metrics.clone();
        let cancel = self.cancellation.clone();
        let job_timeout = self.config.job_timeout;

        Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = job.clone();
            let metrics = metrics.clone();
            let cancel = cancel.clone();

            Box::pin(async move {
                execute_run(job, metrics, cancel, job_timeout).await;
            })
        })
        .map_err(|err| {
            SchedulerError::JobRegistrationFailed(format!(
                "invalid cron expression '{}': {err}",
                self.config.cron_expression
            ))
        })
    }
}

/// One bounded run. Failures are already logged by the job itself; this only
/// accounts for them.
async fn execute_run(
    job: Arc<dyn ScheduledSync>,
    metrics: Arc<SyncMetrics>,
    cancel: CancellationToken,
    job_timeout: Duration,
) {
    log_metric(metrics.record_invocation(), "scheduler.sync.job.invoked");
    let started = Instant::now();
    let run_id = Uuid::now_v7();
    let run = job.run().instrument(info_span!("sync_run", %run_id));

    let outcome = tokio::select! {
        () = cancel.cancelled() => {
            debug!(%run_id, "Sync run cancelled by scheduler shutdown");
            return;
        }
        outcome = tokio::time::timeout(job_timeout, run) => outcome,
    };

    match outcome {
        Ok(Ok(report)) => {
            log_metric(metrics.record_success(&report), "scheduler.sync.job.success");
            log_metric(metrics.record_run_time(started.elapsed()), "scheduler.sync.job.duration");
        }
        Ok(Err(err)) => {
            log_metric(metrics.record_failure(err.kind()), "scheduler.sync.job.error");
            log_metric(metrics.record_run_time(started.elapsed()), "scheduler.sync.job.duration");
            debug!(%run_id, phase = %err.phase, kind = %err.kind(), "Sync run did not complete");
        }
        Err(_) => {
            log_metric(metrics.record_timeout(), "scheduler.sync.job.timeout");
            warn!(%run_id, timeout_secs = job_timeout.as_secs(), "Sync run timed out");
        }
    }
}

fn log_metric(result: MetricsResult<()>, metric: &'static str) {
    if let Err(err) = result {
        warn!(metric = metric, error = ?err, "Failed to record scheduler metric");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
