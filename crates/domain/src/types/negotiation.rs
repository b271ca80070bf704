//! Persisted negotiation records
//!
//! A negotiation is the denormalized mirror of one CRM deal: the deal's own
//! fields plus the names and display orders of its funnel and stage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status derived from the deal's tri-state win flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    /// `Em andamento`
    InProgress,
    /// `Ganha`
    Won,
    /// `Perdida`
    Lost,
}

crate::impl_label_conversions!(NegotiationStatus {
    InProgress => "Em andamento",
    Won => "Ganha",
    Lost => "Perdida",
});

impl NegotiationStatus {
    /// Derive the status from the CRM win flag.
    ///
    /// `None` (unresolved) is in progress, `true` won, `false` lost.
    pub const fn from_win(win: Option<bool>) -> Self {
        match win {
            None => Self::InProgress,
            Some(true) => Self::Won,
            Some(false) => Self::Lost,
        }
    }
}

/// Canonical persisted shape of a deal, keyed by `crm_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    /// Deal id; the natural key
    pub crm_id: String,
    /// `criada_em`
    pub created_at: DateTime<Utc>,
    /// `valor_recorrente`
    pub recurring_value: Option<f64>,
    /// `valor_nao_recorrente`
    pub non_recurring_value: Option<f64>,
    /// `previsao_fechamento`
    pub predicted_close_date: Option<NaiveDate>,
    /// Derived from the win flag
    pub status: NegotiationStatus,
    /// Funnel name
    pub funnel: String,
    /// Funnel display order
    pub funnel_order: i32,
    /// Stage name
    pub stage: String,
    /// Stage display order within its funnel
    pub stage_order: i32,
    /// `data_fechamento`
    pub closed_at: Option<DateTime<Utc>>,
}

/// Row counts applied by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Rows inserted
    pub inserted: usize,
    /// Rows overwritten
    pub updated: usize,
    /// Rows removed
    pub deleted: usize,
}

impl ReconcileSummary {
    /// Total number of rows written or removed.
    pub const fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}
