//! Configuration structures
//!
//! Populated by the infra config loader from the environment or a TOML/JSON
//! file. Every section has defaults except the CRM token.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CRM_BASE_URL, DEFAULT_CRON, DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_JOB_NAME, DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, DEFAULT_PG_CONNECT_TIMEOUT_SECS,
    DEFAULT_PG_PORT, DEFAULT_SQLITE_PATH, DEFAULT_TABLE_NAME, DEFAULT_TABLE_SCHEMA,
    DEFAULT_WON_LOOKBACK_MONTHS,
};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// CRM API access
    pub crm: CrmConfig,
    /// Where negotiations are persisted
    #[serde(default)]
    pub store: StoreConfig,
    /// Cron trigger
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Reconciliation strategy and run-lock key
    #[serde(default)]
    pub sync: SyncConfig,
}

/// CRM API access.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmConfig {
    /// API root, without a trailing slash
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,
    /// API token, sent as the `token` query parameter
    pub token: String,
    /// Deals per page (the API caps this at 200)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per request, first try included
    #[serde(default = "default_http_max_attempts")]
    pub max_attempts: usize,
    /// How many months back the recently-won view reaches
    #[serde(default = "default_won_lookback_months")]
    pub won_lookback_months: u32,
}

impl CrmConfig {
    /// Defaults for everything but the token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            base_url: default_crm_base_url(),
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            won_lookback_months: DEFAULT_WON_LOOKBACK_MONTHS,
        }
    }
}

impl fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("won_lookback_months", &self.won_lookback_months)
            .finish()
    }
}

/// Which store implementation backs the negotiation table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// PostgreSQL via `tokio-postgres`
    #[default]
    Postgres,
    /// Local SQLite file
    Sqlite,
}

crate::impl_label_conversions!(StoreBackend {
    Postgres => "postgres",
    Sqlite => "sqlite",
});

/// Persisted store location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store implementation
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection parameters for the Postgres backend
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Database file for the SQLite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Schema qualifier (Postgres only)
    #[serde(default = "default_table_schema")]
    pub schema: Option<String>,
    /// Table name
    #[serde(default = "default_table_name")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            postgres: PostgresConfig::default(),
            sqlite_path: default_sqlite_path(),
            schema: default_table_schema(),
            table: default_table_name(),
        }
    }
}

/// `sslmode` subset understood by the Postgres store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    /// Plain text only
    Disable,
    /// TLS when the server offers it
    #[default]
    Prefer,
    /// Fail unless TLS is negotiated
    Require,
}

crate::impl_label_conversions!(SslMode {
    Disable => "disable",
    Prefer => "prefer",
    Require => "require",
});

/// Postgres connection parameters (libpq names).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `PGHOST`
    #[serde(default = "default_pg_host")]
    pub host: String,
    /// `PGPORT`
    #[serde(default = "default_pg_port")]
    pub port: u16,
    /// `PGUSER`
    #[serde(default = "default_pg_user")]
    pub user: String,
    /// `PGPASSWORD`
    #[serde(default)]
    pub password: Option<String>,
    /// `PGDATABASE`
    #[serde(default = "default_pg_dbname")]
    pub dbname: String,
    /// `PGSSLMODE`
    #[serde(default)]
    pub sslmode: SslMode,
    /// Connect timeout
    #[serde(default = "default_pg_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: DEFAULT_PG_PORT,
            user: default_pg_user(),
            password: None,
            dbname: default_pg_dbname(),
            sslmode: SslMode::default(),
            connect_timeout_secs: DEFAULT_PG_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dbname", &self.dbname)
            .field("sslmode", &self.sslmode)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Cron trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 6-field cron expression (seconds first, UTC)
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Also run once as soon as the scheduler starts
    #[serde(default)]
    pub run_on_startup: bool,
    /// Abandon a run that takes longer than this
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_startup: false,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
        }
    }
}

/// How fresh records are written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Insert new ids, overwrite existing ids, delete missing ids.
    #[default]
    Diff,
    /// Delete every row then insert every fresh record.
    ///
    /// Deprecated: rewrites the whole table on every run. Kept only for
    /// deployments that still depend on it.
    NukeAndPave,
}

crate::impl_label_conversions!(ReconcileStrategy {
    Diff => "diff",
    NukeAndPave => "nuke_and_pave",
});

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How fresh records reach the table
    #[serde(default)]
    pub strategy: ReconcileStrategy,
    /// Run-lock key
    #[serde(default = "default_job_name")]
    pub job_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { strategy: ReconcileStrategy::default(), job_name: default_job_name() }
    }
}

fn default_crm_base_url() -> String {
    DEFAULT_CRM_BASE_URL.to_string()
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_http_max_attempts() -> usize {
    DEFAULT_HTTP_MAX_ATTEMPTS
}

const fn default_won_lookback_months() -> u32 {
    DEFAULT_WON_LOOKBACK_MONTHS
}

fn default_sqlite_path() -> String {
    DEFAULT_SQLITE_PATH.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_table_schema() -> Option<String> {
    Some(DEFAULT_TABLE_SCHEMA.to_string())
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_pg_host() -> String {
    "localhost".to_string()
}

const fn default_pg_port() -> u16 {
    DEFAULT_PG_PORT
}

fn default_pg_user() -> String {
    "postgres".to_string()
}

fn default_pg_dbname() -> String {
    "postgres".to_string()
}

const fn default_pg_connect_timeout_secs() -> u64 {
    DEFAULT_PG_CONNECT_TIMEOUT_SECS
}

fn default_cron() -> String {
    DEFAULT_CRON.to_string()
}

const fn default_job_timeout_secs() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

fn default_job_name() -> String {
    DEFAULT_JOB_NAME.to_string()
}
