//! Error types used throughout the application

use thiserror::Error;

/// Coarse classification of a [`DealSyncError`].
///
/// The job driver and scheduler use this to decide log severity and to label
/// failures; nothing in the run retries on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catalog or deal-page request/decoding failed.
    UpstreamFetch,
    /// A deal references data the catalog does not contain.
    DataIntegrity,
    /// Any read, write or transaction error against the store.
    Persistence,
    /// Missing or malformed configuration.
    Config,
    /// Another run holds the run lock.
    Concurrency,
    /// Invariant violations and runtime plumbing failures.
    Internal,
}

crate::impl_label_conversions!(ErrorKind {
    UpstreamFetch => "upstream_fetch",
    DataIntegrity => "data_integrity",
    Persistence => "persistence",
    Config => "config",
    Concurrency => "concurrency",
    Internal => "internal",
});

/// Main error type for dealsync
#[derive(Error, Debug)]
pub enum DealSyncError {
    /// Transport failure, timeout or 5xx
    #[error("Network error: {0}")]
    Network(String),

    /// 401/403 from the CRM
    #[error("Authentication error: {0}")]
    Auth(String),

    /// 429 from the CRM
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Unexpected response body
    #[error("Failed to decode CRM response: {0}")]
    Decode(String),

    /// Funnel catalog request failed
    #[error("Failed to fetch funnels: {source}")]
    Catalog {
        /// Underlying failure
        #[source]
        source: Box<DealSyncError>,
    },

    /// Deal page request failed
    #[error("Failed to fetch deals on page {page} with filter {filter}: {source}")]
    DealPage {
        /// Filter that produced the page
        filter: String,
        /// 1-based page number
        page: u32,
        /// Underlying failure
        #[source]
        source: Box<DealSyncError>,
    },

    /// Deal points at a stage missing from the catalog
    #[error("Deal {deal_id} references unknown stage {stage_id}")]
    UnknownStage {
        /// Offending deal
        deal_id: String,
        /// Stage id it references
        stage_id: String,
    },

    /// Store read, write or transaction failure
    #[error("Database error: {0}")]
    Database(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run lock held elsewhere
    #[error("Sync already running: {0}")]
    AlreadyRunning(String),

    /// Caller passed an argument out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Runtime plumbing failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DealSyncError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_)
            | Self::Auth(_)
            | Self::RateLimited(_)
            | Self::Decode(_)
            | Self::Catalog { .. }
            | Self::DealPage { .. } => ErrorKind::UpstreamFetch,
            Self::UnknownStage { .. } => ErrorKind::DataIntegrity,
            Self::Database(_) => ErrorKind::Persistence,
            Self::Config(_) => ErrorKind::Config,
            Self::AlreadyRunning(_) => ErrorKind::Concurrency,
            Self::InvalidInput(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap a catalog request failure.
    pub fn catalog(source: DealSyncError) -> Self {
        Self::Catalog { source: Box::new(source) }
    }

    /// Wrap a deal-page failure with the filter and page that produced it.
    pub fn deal_page(filter: impl Into<String>, page: u32, source: DealSyncError) -> Self {
        Self::DealPage { filter: filter.into(), page, source: Box::new(source) }
    }
}

/// Result type alias for dealsync operations
pub type Result<T> = std::result::Result<T, DealSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_failures_keep_filter_and_page_in_message() {
        let err = DealSyncError::deal_page(
            "win=null",
            3,
            DealSyncError::Network("HTTP connection failure".into()),
        );

        let message = err.to_string();
        assert!(message.contains("page 3"));
        assert!(message.contains("win=null"));
        assert!(message.contains("HTTP connection failure"));
        assert_eq!(err.kind(), ErrorKind::UpstreamFetch);
    }

    #[test]
    fn kinds_follow_the_failure_taxonomy() {
        assert_eq!(
            DealSyncError::catalog(DealSyncError::Decode("bad json".into())).kind(),
            ErrorKind::UpstreamFetch
        );
        assert_eq!(
            DealSyncError::UnknownStage { deal_id: "d1".into(), stage_id: "s9".into() }.kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(DealSyncError::Database("boom".into()).kind(), ErrorKind::Persistence);
        assert_eq!(DealSyncError::AlreadyRunning("job".into()).kind(), ErrorKind::Concurrency);
        assert_eq!(DealSyncError::Config("missing".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn error_kind_labels_are_stable() {
        assert_eq!(ErrorKind::DataIntegrity.to_string(), "data_integrity");
        assert_eq!("persistence".parse::<ErrorKind>().unwrap(), ErrorKind::Persistence);
    }
}
