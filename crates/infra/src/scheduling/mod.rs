//! Cron scheduling for sync runs
//!
//! The scheduler follows the runtime rules used across this crate: join
//! handles are tracked, cancellation is explicit, and every asynchronous
//! lifecycle operation is wrapped in a timeout.

pub mod error;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sync_scheduler::{ScheduledSync, SyncScheduler, SyncSchedulerConfig};
