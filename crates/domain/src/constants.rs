//! Application constants
//!
//! Centralized location for domain-level defaults.

// CRM API
/// RD Station CRM REST root
pub const DEFAULT_CRM_BASE_URL: &str = "https://crm.rdstation.com/api/v1";
/// Deals per page; the API maximum
pub const DEFAULT_PAGE_SIZE: u32 = 200;
/// Per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Attempts per HTTP request, first try included
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
/// Reach of the recently-won view, in whole months
pub const DEFAULT_WON_LOOKBACK_MONTHS: u32 = 11;
/// Appended to the `start_date` filter value
pub const START_DATE_SUFFIX: &str = "T00:00:00";

// Persisted table
/// Postgres schema of the negotiation table
pub const DEFAULT_TABLE_SCHEMA: &str = "comercial";
/// Negotiation table name
pub const DEFAULT_TABLE_NAME: &str = "negociacoes";
/// SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "dealsync.db";

// Scheduling
/// Every 15 minutes during business hours, Monday to Friday (6-field, UTC)
pub const DEFAULT_CRON: &str = "0 */15 11,14-19 * * Mon-Fri";
/// Whole-run timeout enforced by the scheduler
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
/// Run-lock key
pub const DEFAULT_JOB_NAME: &str = "dealsync.negotiations";

// Postgres
/// `PGPORT` default
pub const DEFAULT_PG_PORT: u16 = 5432;
/// Connect timeout
pub const DEFAULT_PG_CONNECT_TIMEOUT_SECS: u64 = 10;
