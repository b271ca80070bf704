//! Application context - dependency injection container

use std::sync::Arc;

use dealsync_core::{
    DealSource, LayeredRunLock, LocalRunLock, NegotiationStore, RunLock, SyncJob, SyncSettings,
};
use dealsync_domain::{Config, Result, StoreBackend};
use dealsync_infra::observability::metrics::SyncMetrics;
use dealsync_infra::scheduling::{SchedulerResult, SyncScheduler, SyncSchedulerConfig};
use dealsync_infra::{
    config, PgAdvisoryLock, PgSession, PostgresNegotiationStore, RdStationClient,
    SqliteNegotiationStore, TableName,
};
use tracing::info;

/// Pool size for the SQLite store; runs never overlap.
const SQLITE_POOL_SIZE: u32 = 2;

/// Application context - holds the wired sync job and its dependencies
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// The wired sync job
    pub job: Arc<SyncJob>,
    /// Counters shared with the scheduler
    pub metrics: Arc<SyncMetrics>,
}

impl AppContext {
    /// Load configuration (environment first, then config files) and wire
    /// everything up.
    pub async fn new() -> Result<Self> {
        let config = config::load()?;
        Self::from_config(config).await
    }

    /// Wire the job for an already-loaded configuration.
    ///
    /// Postgres connects eagerly, so an unreachable database fails here.
    pub async fn from_config(config: Config) -> Result<Self> {
        let source: Arc<dyn DealSource> = Arc::new(RdStationClient::from_config(&config.crm)?);
        let table = TableName::from_store_config(&config.store)?;

        let (store, lock): (Arc<dyn NegotiationStore>, Arc<dyn RunLock>) = match config.store.backend {
            StoreBackend::Postgres => {
                let session = PgSession::connect(&config.store.postgres).await?;
                let store = PostgresNegotiationStore::new(session.clone(), table);
                let lock = LayeredRunLock::new(vec![
                    Arc::new(LocalRunLock::new()) as Arc<dyn RunLock>,
                    Arc::new(PgAdvisoryLock::new(session)),
                ]);
                (Arc::new(store), Arc::new(lock))
            }
            StoreBackend::Sqlite => {
                let store =
                    SqliteNegotiationStore::open(&config.store.sqlite_path, &table, SQLITE_POOL_SIZE)?;
                (Arc::new(store), Arc::new(LocalRunLock::new()))
            }
        };

        let settings = SyncSettings::from_config(&config);
        info!(
            backend = %config.store.backend,
            strategy = %settings.strategy,
            job = %settings.job_name,
            "Sync job wired"
        );

        let job = Arc::new(SyncJob::new(source, store, lock, settings));
        Ok(Self { config, job, metrics: Arc::new(SyncMetrics::new()) })
    }

    /// Build a scheduler for the configured cron expression.
    pub fn scheduler(&self) -> SchedulerResult<SyncScheduler> {
        SyncScheduler::with_config(
            SyncSchedulerConfig::from_schedule(&self.config.schedule),
            self.job.clone(),
            self.metrics.clone(),
        )
    }
}
