//! Paginated deal fetching

use std::sync::Arc;

use dealsync_domain::{Deal, DealFilter, DealSyncError, Result};
use tracing::{debug, warn};

use super::ports::DealSource;

/// Walks `GET /deals` pages until the source reports no more.
pub struct DealFetcher {
    source: Arc<dyn DealSource>,
    page_size: u32,
}

impl DealFetcher {
    /// Fetch from `source`, `page_size` deals per request.
    pub fn new(source: Arc<dyn DealSource>, page_size: u32) -> Self {
        Self { source, page_size }
    }

    /// Fetch every deal matching `filter`, in arrival order.
    ///
    /// Any failing page fails the whole fetch; no partial result is returned.
    pub async fn fetch_all(&self, filter: &DealFilter) -> Result<Vec<Deal>> {
        if self.page_size == 0 {
            return Err(DealSyncError::InvalidInput("page size must be greater than zero".into()));
        }

        let mut deals = Vec::new();
        let mut page = 1;

        loop {
            let batch = self
                .source
                .fetch_deal_page(filter, page, self.page_size)
                .await
                .map_err(|err| DealSyncError::deal_page(filter.to_string(), page, err))?;

            debug!(%filter, page, received = batch.deals.len(), has_more = batch.has_more, "Fetched deal page");

            if batch.deals.is_empty() && batch.has_more {
                warn!(%filter, page, "Empty deal page claims more results; stopping");
                break;
            }

            deals.extend(batch.deals);

            if !batch.has_more {
                break;
            }
            page += 1;
        }

        Ok(deals)
    }

    /// Fetch several filters in sequence and concatenate the results.
    ///
    /// Deals matching more than one filter appear once per filter.
    pub async fn fetch_all_filters(&self, filters: &[DealFilter]) -> Result<Vec<Deal>> {
        let mut deals = Vec::new();
        for filter in filters {
            let batch = self.fetch_all(filter).await?;
            debug!(%filter, count = batch.len(), "Filter exhausted");
            deals.extend(batch);
        }
        Ok(deals)
    }
}
