//! Deal query filters

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WON_LOOKBACK_MONTHS, START_DATE_SUFFIX};
use crate::utils::dates::first_of_month_months_ago;

/// Ordered set of query parameters selecting one logical deal view.
///
/// Page, limit and token are added by the client; a filter only carries the
/// view-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealFilter {
    params: Vec<(String, String)>,
}

impl DealFilter {
    /// Empty filter (all deals).
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Deals whose outcome is not decided yet.
    pub fn open() -> Self {
        Self::new().with("win", "null")
    }

    /// Deals won since the first day of the month `lookback_months` before
    /// `today`.
    pub fn recently_won(today: NaiveDate, lookback_months: u32) -> Self {
        let start = first_of_month_months_ago(today, lookback_months).unwrap_or(today);
        Self::new()
            .with("win", "true")
            .with("closed_at_period", "true")
            .with("start_date", format!("{}{START_DATE_SUFFIX}", start.format("%Y-%m-%d")))
    }

    /// The two views merged on every run: open deals, then recent wins.
    pub fn standard_set(today: NaiveDate, lookback_months: u32) -> Vec<Self> {
        vec![Self::open(), Self::recently_won(today, lookback_months)]
    }

    /// Standard set with the default look-back.
    pub fn default_set(today: NaiveDate) -> Vec<Self> {
        Self::standard_set(today, DEFAULT_WON_LOOKBACK_MONTHS)
    }

    /// Query parameters in insertion order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl Default for DealFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DealFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return f.write_str("<all>");
        }
        for (idx, (key, value)) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
