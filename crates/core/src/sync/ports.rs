//! Port interfaces for the deal sync

use async_trait::async_trait;
use dealsync_domain::{DealFilter, DealPage, Funnel, Negotiation, Result};

use super::reconciler::ChangeSet;

/// Read access to the CRM.
#[async_trait]
pub trait DealSource: Send + Sync {
    /// Fetch the complete funnel/stage catalog (not paginated)
    async fn fetch_funnels(&self) -> Result<Vec<Funnel>>;

    /// Fetch one page of deals matching `filter`. Pages start at 1.
    async fn fetch_deal_page(&self, filter: &DealFilter, page: u32, limit: u32) -> Result<DealPage>;
}

/// The persisted negotiation table.
#[async_trait]
pub trait NegotiationStore: Send + Sync {
    /// Read every persisted row
    async fn load_all(&self) -> Result<Vec<Negotiation>>;

    /// Apply deletes, then updates, then inserts in a single transaction.
    ///
    /// Nothing is visible unless every statement succeeds.
    async fn apply(&self, changes: &ChangeSet) -> Result<()>;

    /// Delete every row and insert `records` in a single transaction.
    /// Returns the number of rows deleted.
    async fn replace_all(&self, records: &[Negotiation]) -> Result<usize>;
}

/// Mutual exclusion for sync runs.
#[async_trait]
pub trait RunLock: Send + Sync {
    /// Try to take the lock without waiting. `Ok(false)` means it is held elsewhere.
    async fn try_acquire(&self, key: &str) -> Result<bool>;

    /// Release a lock previously taken with [`RunLock::try_acquire`]
    async fn release(&self, key: &str) -> Result<()>;
}
