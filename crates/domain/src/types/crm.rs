//! CRM wire types
//!
//! Shapes returned by the RD Station CRM REST API. Field names follow the
//! API, including its misspelling of the recurring amount.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::dates::{deserialize_optional_date, deserialize_optional_utc, deserialize_utc};

/// A CRM sales opportunity as returned by `GET /deals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// CRM id
    pub id: String,
    /// Creation time, normalized to UTC
    #[serde(deserialize_with = "deserialize_utc")]
    pub created_at: DateTime<Utc>,
    /// Recurring amount (`amount_montly` on the wire)
    #[serde(rename = "amount_montly", default)]
    pub amount_monthly: Option<f64>,
    /// One-time amount
    #[serde(default)]
    pub amount_unique: Option<f64>,
    /// Expected close date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub prediction_date: Option<NaiveDate>,
    /// `None` while the deal is open, `Some(true)` won, `Some(false)` lost
    #[serde(default)]
    pub win: Option<bool>,
    /// Current stage
    pub deal_stage: DealStageRef,
    /// Set once the deal is won or lost
    #[serde(default, deserialize_with = "deserialize_optional_utc")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Stage entry embedded in a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealStageRef {
    /// Stage id, resolved against the funnel catalog
    pub id: String,
    /// Display name, when embedded
    #[serde(default)]
    pub name: Option<String>,
}

/// One page of `GET /deals`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPage {
    /// Deals on this page
    #[serde(default)]
    pub deals: Vec<Deal>,
    /// Whether another page follows
    #[serde(default)]
    pub has_more: bool,
    /// Total matches, when the API reports it
    #[serde(default)]
    pub total: Option<u64>,
}

/// A pipeline as returned by `GET /deal_pipelines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funnel {
    /// Pipeline id
    pub id: String,
    /// Display name
    pub name: String,
    /// Display order among funnels
    pub order: i32,
    /// Stages in this funnel
    #[serde(default)]
    pub deal_stages: Vec<Stage>,
}

/// One step of a [`Funnel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage id, referenced by deals
    pub id: String,
    /// Display name
    pub name: String,
    /// Display order within the funnel
    pub order: i32,
}
