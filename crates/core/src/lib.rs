//! # dealsync Core
//!
//! Sync logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the CRM, the negotiation store and run locks
//! - Stage resolution, paginated fetching, normalization and reconciliation
//! - The job driver that runs one sync
//!
//! ## Architecture Principles
//! - Only depends on `dealsync-domain`
//! - No database or HTTP code
//! - All external dependencies via traits

pub mod sync;

pub use sync::ports::{DealSource, NegotiationStore, RunLock};
pub use sync::{
    ChangeSet, DealFetcher, LayeredRunLock, LocalRunLock, Reconciler, StageCatalog, SyncJob,
    SyncPhase, SyncReport, SyncRunError, SyncSettings,
};
