//! Scripted `DealSource`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dealsync_core::DealSource;
use dealsync_domain::{DealFilter, DealPage, DealSyncError, Funnel, Result as DomainResult};
use tokio::sync::Notify;

/// Serves canned funnels and pages keyed by filter string and page number.
///
/// Unscripted pages come back empty with `has_more = false`.
#[derive(Default, Clone)]
pub struct ScriptedDealSource {
    funnels: Vec<Funnel>,
    pages: Arc<Mutex<HashMap<(String, u32), DealPage>>>,
    fail_catalog: bool,
    fail_page: Option<(String, u32)>,
    requests: Arc<Mutex<Vec<(String, u32, u32)>>>,
    gate: Option<Gate>,
}

/// Parks `fetch_funnels` until released.
#[derive(Default, Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ScriptedDealSource {
    pub fn new(funnels: Vec<Funnel>) -> Self {
        Self { funnels, ..Self::default() }
    }

    /// Script the pages of `filter`, numbered from 1.
    pub fn with_pages(self, filter: &DealFilter, pages: Vec<DealPage>) -> Self {
        {
            let mut scripted = self.pages.lock().unwrap();
            for (index, page) in pages.into_iter().enumerate() {
                scripted.insert((filter.to_string(), index as u32 + 1), page);
            }
        }
        self
    }

    pub fn failing_catalog(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn failing_page(mut self, filter: &DealFilter, page: u32) -> Self {
        self.fail_page = Some((filter.to_string(), page));
        self
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// `(filter, page, limit)` for every deal page request, in order.
    pub fn requests(&self) -> Vec<(String, u32, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DealSource for ScriptedDealSource {
    async fn fetch_funnels(&self) -> DomainResult<Vec<Funnel>> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_catalog {
            return Err(DealSyncError::Network("connection reset".into()));
        }
        Ok(self.funnels.clone())
    }

    async fn fetch_deal_page(
        &self,
        filter: &DealFilter,
        page: u32,
        limit: u32,
    ) -> DomainResult<DealPage> {
        let key = (filter.to_string(), page);
        self.requests.lock().unwrap().push((key.0.clone(), page, limit));

        if self.fail_page.as_ref() == Some(&key) {
            return Err(DealSyncError::Network("HTTP 502 from upstream".into()));
        }
        Ok(self.pages.lock().unwrap().get(&key).cloned().unwrap_or_default())
    }
}
