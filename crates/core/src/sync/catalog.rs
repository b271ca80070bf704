//! Funnel/stage resolution
//!
//! Flattens the CRM pipeline catalog into lookups keyed by stage id. Each
//! stage records its owning funnel while the catalog is walked, so a deal
//! only needs its stage id to find both.

use std::collections::HashMap;

use dealsync_domain::{DealSyncError, Funnel, Result};
use tracing::{debug, warn};

use super::ports::DealSource;

/// Immutable stage lookups for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCatalog {
    funnel_names: HashMap<String, String>,
    funnel_orders: HashMap<String, i32>,
    stage_orders: HashMap<String, i32>,
    stage_names: HashMap<String, String>,
}

/// Everything the catalog knows about one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStage<'a> {
    /// Owning funnel's name
    pub funnel: &'a str,
    /// Owning funnel's display order
    pub funnel_order: i32,
    /// Display order within the funnel
    pub stage_order: i32,
    /// Catalog name of the stage
    pub stage_name: &'a str,
}

impl StageCatalog {
    /// Build the lookups from a fetched catalog.
    ///
    /// A stage id listed under more than one funnel keeps the later funnel.
    pub fn from_funnels(funnels: &[Funnel]) -> Self {
        let mut catalog = Self::default();

        for funnel in funnels {
            for stage in &funnel.deal_stages {
                if let Some(previous) = catalog.funnel_names.get(&stage.id) {
                    warn!(
                        stage_id = %stage.id,
                        previous_funnel = %previous,
                        funnel = %funnel.name,
                        "Stage listed under more than one funnel; keeping the later one"
                    );
                }
                catalog.funnel_names.insert(stage.id.clone(), funnel.name.clone());
                catalog.funnel_orders.insert(stage.id.clone(), funnel.order);
                catalog.stage_orders.insert(stage.id.clone(), stage.order);
                catalog.stage_names.insert(stage.id.clone(), stage.name.clone());
            }
        }

        catalog
    }

    /// Look up a stage id.
    pub fn resolve(&self, stage_id: &str) -> Option<ResolvedStage<'_>> {
        Some(ResolvedStage {
            funnel: self.funnel_names.get(stage_id)?,
            funnel_order: *self.funnel_orders.get(stage_id)?,
            stage_order: *self.stage_orders.get(stage_id)?,
            stage_name: self.stage_names.get(stage_id)?,
        })
    }

    /// Name of the funnel owning `stage_id`.
    pub fn funnel_name(&self, stage_id: &str) -> Option<&str> {
        self.funnel_names.get(stage_id).map(String::as_str)
    }

    /// Display order of the funnel owning `stage_id`.
    pub fn funnel_order(&self, stage_id: &str) -> Option<i32> {
        self.funnel_orders.get(stage_id).copied()
    }

    /// Display order of `stage_id` within its funnel.
    pub fn stage_order(&self, stage_id: &str) -> Option<i32> {
        self.stage_orders.get(stage_id).copied()
    }

    /// Number of distinct stage ids
    pub fn len(&self) -> usize {
        self.stage_orders.len()
    }

    /// True when no funnel listed any stage.
    pub fn is_empty(&self) -> bool {
        self.stage_orders.is_empty()
    }
}

/// Fetch the catalog once and build the lookups.
pub async fn load_catalog(source: &dyn DealSource) -> Result<StageCatalog> {
    let funnels = source.fetch_funnels().await.map_err(DealSyncError::catalog)?;
    let catalog = StageCatalog::from_funnels(&funnels);
    debug!(funnels = funnels.len(), stages = catalog.len(), "Loaded funnel catalog");
    Ok(catalog)
}
