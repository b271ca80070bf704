//! # dealsync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The RD Station CRM client ([`DealSource`](dealsync_core::DealSource))
//! - PostgreSQL and SQLite negotiation stores plus the advisory run lock
//! - Configuration loading from the environment and config files
//! - The cron scheduler and its run metrics
//!
//! ## Architecture
//! - Implements traits defined in `dealsync-core`
//! - Contains all "impure" code (I/O, network, database)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use database::{
    PgAdvisoryLock, PgSession, PostgresNegotiationStore, SqliteNegotiationStore, TableName,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::RdStationClient;
pub use scheduling::{SyncScheduler, SyncSchedulerConfig};
