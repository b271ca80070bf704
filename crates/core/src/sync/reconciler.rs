//! Table reconciliation
//!
//! Compares a fresh snapshot of negotiations against the persisted table and
//! writes the difference in one transaction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dealsync_domain::{Negotiation, ReconcileStrategy, ReconcileSummary, Result};
use tracing::{debug, warn};

use super::ports::NegotiationStore;

/// Writes needed to turn the persisted table into the fresh snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Fresh records with no persisted row
    pub inserts: Vec<Negotiation>,
    /// Fresh records with a persisted row (full-row overwrite)
    pub updates: Vec<Negotiation>,
    /// Persisted ids absent from the snapshot
    pub deletes: Vec<String>,
}

impl ChangeSet {
    /// Partition `fresh` against the persisted ids.
    ///
    /// Records sharing a `crm_id` collapse to the last one, at the position
    /// where the id first appeared. Deletes are sorted by id.
    pub fn plan<'a, I>(persisted_ids: I, fresh: Vec<Negotiation>) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let persisted: HashSet<&str> = persisted_ids.into_iter().collect();
        let fresh = dedupe_by_id(fresh);
        let fresh_ids: HashSet<&str> = fresh.iter().map(|record| record.crm_id.as_str()).collect();

        let mut deletes: Vec<String> = persisted
            .iter()
            .filter(|id| !fresh_ids.contains(*id))
            .map(|id| (*id).to_string())
            .collect();
        deletes.sort_unstable();

        let (updates, inserts): (Vec<_>, Vec<_>) =
            fresh.into_iter().partition(|record| persisted.contains(record.crm_id.as_str()));

        Self { inserts, updates, deletes }
    }

    /// Counts this change set would apply.
    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            inserted: self.inserts.len(),
            updated: self.updates.len(),
            deleted: self.deletes.len(),
        }
    }

    /// True when the store already matches.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Collapse records sharing a `crm_id`: last value wins, first position kept.
fn dedupe_by_id(records: Vec<Negotiation>) -> Vec<Negotiation> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<Negotiation> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.crm_id) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(record.crm_id.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Applies a fresh snapshot to the store.
pub struct Reconciler {
    store: Arc<dyn NegotiationStore>,
    strategy: ReconcileStrategy,
}

impl Reconciler {
    /// Diff-based reconciler over `store`.
    pub fn new(store: Arc<dyn NegotiationStore>) -> Self {
        Self { store, strategy: ReconcileStrategy::Diff }
    }

    /// Override the write strategy.
    pub fn with_strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Strategy in use.
    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// Make the table equal to `fresh`, returning the applied counts.
    pub async fn reconcile(&self, fresh: Vec<Negotiation>) -> Result<ReconcileSummary> {
        match self.strategy {
            ReconcileStrategy::Diff => self.reconcile_diff(fresh).await,
            ReconcileStrategy::NukeAndPave => self.nuke_and_pave(fresh).await,
        }
    }

    async fn reconcile_diff(&self, fresh: Vec<Negotiation>) -> Result<ReconcileSummary> {
        let persisted = self.store.load_all().await?;
        let changes = ChangeSet::plan(persisted.iter().map(|row| row.crm_id.as_str()), fresh);
        let summary = changes.summary();

        debug!(
            persisted = persisted.len(),
            inserts = summary.inserted,
            updates = summary.updated,
            deletes = summary.deleted,
            "Planned reconciliation"
        );

        if !changes.is_empty() {
            self.store.apply(&changes).await?;
        }
        Ok(summary)
    }

    async fn nuke_and_pave(&self, fresh: Vec<Negotiation>) -> Result<ReconcileSummary> {
        warn!("Using deprecated nuke_and_pave strategy; every row is deleted and rewritten");

        let fresh = dedupe_by_id(fresh);
        let deleted = self.store.replace_all(&fresh).await?;

        Ok(ReconcileSummary { inserted: fresh.len(), updated: 0, deleted })
    }
}
