//! CRM deal synchronization
//!
//! Pure orchestration over the ports in [`ports`]; all I/O lives behind them.

pub mod catalog;
pub mod fetcher;
pub mod job;
pub mod lock;
pub mod normalizer;
pub mod ports;
pub mod reconciler;

pub use catalog::{load_catalog, ResolvedStage, StageCatalog};
pub use fetcher::DealFetcher;
pub use job::{SyncJob, SyncPhase, SyncReport, SyncRunError, SyncSettings};
pub use lock::{LayeredRunLock, LocalRunLock};
pub use normalizer::{normalize, normalize_all};
pub use reconciler::{ChangeSet, Reconciler};
