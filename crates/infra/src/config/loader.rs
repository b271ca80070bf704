//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment when one exists
//! 2. Attempts to load from environment variables (`CRM_TOKEN` is required)
//! 3. If that fails, falls back to loading from a file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CRM_TOKEN`: CRM API token (required)
//! - `DEALSYNC_CRM_BASE_URL`, `DEALSYNC_CRM_PAGE_SIZE`,
//!   `DEALSYNC_CRM_TIMEOUT_SECS`, `DEALSYNC_CRM_MAX_ATTEMPTS`,
//!   `DEALSYNC_WON_LOOKBACK_MONTHS`
//! - `DEALSYNC_STORE`: `postgres` (default) or `sqlite`
//! - `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`, `PGDATABASE`, `PGSSLMODE`,
//!   `PGCONNECT_TIMEOUT`
//! - `DEALSYNC_SQLITE_PATH`, `DEALSYNC_TABLE_SCHEMA`, `DEALSYNC_TABLE_NAME`
//! - `DEALSYNC_CRON`, `DEALSYNC_RUN_ON_STARTUP`, `DEALSYNC_JOB_TIMEOUT_SECS`
//! - `DEALSYNC_STRATEGY`: `diff` (default) or `nuke_and_pave`
//! - `DEALSYNC_JOB_NAME`: run-lock key
//!
//! ## File Locations
//! The loader probes `dealsync.toml`, `dealsync.json`, `config.toml` and
//! `config.json` in the working directory, then next to the executable.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dealsync_domain::{
    Config, CrmConfig, DealSyncError, PostgresConfig, Result, ScheduleConfig, StoreConfig,
    SyncConfig,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["dealsync.toml", "dealsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `DealSyncError::Config` if configuration cannot be loaded from
/// either source or fails validation.
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None).map_err(|file_err| {
                DealSyncError::Config(format!("{e}; file fallback failed: {file_err}"))
            })
        }
    }
}

/// Load configuration from environment variables
///
/// Only `CRM_TOKEN` is required; everything else falls back to defaults.
///
/// # Errors
/// Returns `DealSyncError::Config` if the token is missing or a variable
/// has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut crm = CrmConfig::with_token(env_var("CRM_TOKEN")?);
    if let Some(base_url) = env_opt("DEALSYNC_CRM_BASE_URL") {
        crm.base_url = base_url;
    }
    set_parsed(&mut crm.page_size, "DEALSYNC_CRM_PAGE_SIZE")?;
    set_parsed(&mut crm.timeout_secs, "DEALSYNC_CRM_TIMEOUT_SECS")?;
    set_parsed(&mut crm.max_attempts, "DEALSYNC_CRM_MAX_ATTEMPTS")?;
    set_parsed(&mut crm.won_lookback_months, "DEALSYNC_WON_LOOKBACK_MONTHS")?;

    let mut postgres = PostgresConfig::default();
    if let Some(host) = env_opt("PGHOST") {
        postgres.host = host;
    }
    set_parsed(&mut postgres.port, "PGPORT")?;
    if let Some(user) = env_opt("PGUSER") {
        postgres.user = user;
    }
    postgres.password = env_opt("PGPASSWORD");
    if let Some(dbname) = env_opt("PGDATABASE") {
        postgres.dbname = dbname;
    }
    set_parsed(&mut postgres.sslmode, "PGSSLMODE")?;
    set_parsed(&mut postgres.connect_timeout_secs, "PGCONNECT_TIMEOUT")?;

    let mut store = StoreConfig { postgres, ..StoreConfig::default() };
    set_parsed(&mut store.backend, "DEALSYNC_STORE")?;
    if let Some(path) = env_opt("DEALSYNC_SQLITE_PATH") {
        store.sqlite_path = path;
    }
    if let Ok(schema) = std::env::var("DEALSYNC_TABLE_SCHEMA") {
        // Set but empty means "no schema".
        store.schema = Some(schema).filter(|s| !s.trim().is_empty());
    }
    if let Some(table) = env_opt("DEALSYNC_TABLE_NAME") {
        store.table = table;
    }

    let mut schedule = ScheduleConfig::default();
    if let Some(cron) = env_opt("DEALSYNC_CRON") {
        schedule.cron = cron;
    }
    schedule.run_on_startup = env_bool("DEALSYNC_RUN_ON_STARTUP", false);
    set_parsed(&mut schedule.job_timeout_secs, "DEALSYNC_JOB_TIMEOUT_SECS")?;

    let mut sync = SyncConfig::default();
    set_parsed(&mut sync.strategy, "DEALSYNC_STRATEGY")?;
    if let Some(job_name) = env_opt("DEALSYNC_JOB_NAME") {
        sync.job_name = job_name;
    }

    let config = Config { crm, store, schedule, sync };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected by
/// file extension.
///
/// # Errors
/// Returns `DealSyncError::Config` if the file is missing, malformed or
/// fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DealSyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DealSyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DealSyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from string content (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DealSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DealSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DealSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Reject values the job cannot run with.
fn validate(config: &Config) -> Result<()> {
    if config.crm.token.trim().is_empty() {
        return Err(DealSyncError::Config("CRM token must not be empty".into()));
    }
    if config.crm.page_size == 0 {
        return Err(DealSyncError::Config("page size must be greater than zero".into()));
    }
    if config.schedule.cron.trim().is_empty() {
        return Err(DealSyncError::Config("cron expression must not be empty".into()));
    }
    if config.schedule.job_timeout_secs == 0 {
        return Err(DealSyncError::Config("job timeout must be greater than zero".into()));
    }
    if config.store.table.trim().is_empty() {
        return Err(DealSyncError::Config("table name must not be empty".into()));
    }
    Ok(())
}

/// Probe the working directory, then the executable's directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        DealSyncError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional environment variable; empty counts as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Overwrite `target` when `key` is set, failing on unparsable input.
fn set_parsed<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = env_opt(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| DealSyncError::Config(format!("Invalid value for {key} ({raw}): {e}")))?;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
