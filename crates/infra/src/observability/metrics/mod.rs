//! Metrics collection modules

pub mod sync;

pub use sync::{SyncMetrics, SyncMetricsSnapshot};
