//! In-memory `NegotiationStore` with fault injection

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dealsync_core::{ChangeSet, NegotiationStore};
use dealsync_domain::{DealSyncError, Negotiation, Result as DomainResult};

/// Rows keyed by `crm_id`. Writes stage on a copy and only swap it in when
/// every step succeeds, like a rolled-back transaction.
#[derive(Default, Clone)]
pub struct InMemoryNegotiationStore {
    rows: Arc<Mutex<BTreeMap<String, Negotiation>>>,
    fail_inserts: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
    apply_calls: Arc<AtomicUsize>,
    replace_calls: Arc<AtomicUsize>,
}

impl InMemoryNegotiationStore {
    pub fn seeded(rows: Vec<Negotiation>) -> Self {
        let store = Self::default();
        {
            let mut map = store.rows.lock().unwrap();
            for row in rows {
                map.insert(row.crm_id.clone(), row);
            }
        }
        store
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Negotiation> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NegotiationStore for InMemoryNegotiationStore {
    async fn load_all(&self) -> DomainResult<Vec<Negotiation>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(DealSyncError::Database("select failed".into()));
        }
        Ok(self.rows())
    }

    async fn apply(&self, changes: &ChangeSet) -> DomainResult<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let mut staged = self.rows.lock().unwrap().clone();

        for id in &changes.deletes {
            staged.remove(id);
        }
        for row in &changes.updates {
            staged.insert(row.crm_id.clone(), row.clone());
        }
        for row in &changes.inserts {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(DealSyncError::Database("insert failed".into()));
            }
            if staged.insert(row.crm_id.clone(), row.clone()).is_some() {
                return Err(DealSyncError::Database(format!("duplicate key {}", row.crm_id)));
            }
        }

        *self.rows.lock().unwrap() = staged;
        Ok(())
    }

    async fn replace_all(&self, records: &[Negotiation]) -> DomainResult<usize> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) && !records.is_empty() {
            return Err(DealSyncError::Database("insert failed".into()));
        }
        let staged = records.iter().map(|row| (row.crm_id.clone(), row.clone())).collect();
        let previous = std::mem::replace(&mut *self.rows.lock().unwrap(), staged);
        Ok(previous.len())
    }
}
