//! SQLite-backed negotiation store.
//!
//! Used for local runs and tests. Blocking rusqlite calls run on the tokio
//! blocking pool; every write goes through one transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dealsync_core::{ChangeSet, NegotiationStore};
use dealsync_domain::{DealSyncError, Negotiation, NegotiationStatus, Result as DomainResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, Statement};
use tokio::task;
use tracing::{debug, info, warn};

use super::table::{Dialect, TableName};
use crate::errors::InfraError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Prepared SQL for one table.
#[derive(Debug)]
struct Statements {
    create: String,
    select_all: String,
    insert: String,
    update: String,
    delete: String,
    delete_all: String,
}

impl Statements {
    fn new(table: &TableName) -> Self {
        Self {
            create: format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    crm_id TEXT PRIMARY KEY NOT NULL,
                    criada_em TEXT NOT NULL,
                    valor_recorrente REAL,
                    valor_nao_recorrente REAL,
                    previsao_fechamento TEXT,
                    status TEXT NOT NULL,
                    funil TEXT NOT NULL,
                    ordem_funil INTEGER NOT NULL,
                    estagio TEXT NOT NULL,
                    ordem_estagio INTEGER NOT NULL,
                    data_fechamento TEXT
                )",
                table.quoted()
            ),
            select_all: table.select_all_sql(Dialect::Sqlite),
            insert: table.insert_sql(Dialect::Sqlite),
            update: table.update_sql(Dialect::Sqlite),
            delete: table.delete_sql(Dialect::Sqlite),
            delete_all: table.delete_all_sql(),
        }
    }
}

/// SQLite implementation of [`NegotiationStore`].
pub struct SqliteNegotiationStore {
    pool: Pool<SqliteConnectionManager>,
    statements: Arc<Statements>,
    path: PathBuf,
}

impl SqliteNegotiationStore {
    /// Open (or create) the database file and make sure the table exists.
    ///
    /// SQLite has no schemas here, so any schema on `table` is dropped.
    pub fn open<P: AsRef<Path>>(db_path: P, table: &TableName, pool_size: u32) -> DomainResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn: &mut Connection| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(InfraError::from)?;

        let store = Self { pool, statements: Arc::new(Statements::new(&table.unqualified())), path };
        store.ensure_table()?;

        info!(db_path = %store.path.display(), "sqlite negotiation store ready");
        Ok(store)
    }

    /// Acquire a pooled connection.
    pub fn get_connection(&self) -> DomainResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get().map_err(InfraError::from)?)
    }

    /// Database file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_table(&self) -> DomainResult<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(&self.statements.create).map_err(map_sql_error)
    }

    async fn run_blocking<T, F>(&self, op: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &Statements) -> DomainResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let statements = Arc::clone(&self.statements);

        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = pool.get().map_err(InfraError::from)?;
            op(&mut conn, &statements)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl NegotiationStore for SqliteNegotiationStore {
    async fn load_all(&self) -> DomainResult<Vec<Negotiation>> {
        self.run_blocking(|conn, sql| {
            let mut stmt = conn.prepare(&sql.select_all).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], negotiation_from_row)
                .map_err(map_sql_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sql_error)?;
            debug!(rows = rows.len(), "Loaded persisted negotiations");
            Ok(rows)
        })
        .await
    }

    async fn apply(&self, changes: &ChangeSet) -> DomainResult<()> {
        let changes = changes.clone();

        self.run_blocking(move |conn, sql| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            {
                let mut delete = tx.prepare(&sql.delete).map_err(map_sql_error)?;
                for id in &changes.deletes {
                    delete.execute(params![id]).map_err(map_sql_error)?;
                }

                let mut update = tx.prepare(&sql.update).map_err(map_sql_error)?;
                for row in &changes.updates {
                    if execute_row(&mut update, row).map_err(map_sql_error)? == 0 {
                        warn!(crm_id = %row.crm_id, "Update matched no row");
                    }
                }

                let mut insert = tx.prepare(&sql.insert).map_err(map_sql_error)?;
                for row in &changes.inserts {
                    execute_row(&mut insert, row).map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)
        })
        .await
    }

    async fn replace_all(&self, records: &[Negotiation]) -> DomainResult<usize> {
        let records = records.to_vec();

        self.run_blocking(move |conn, sql| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let deleted = tx.execute(&sql.delete_all, []).map_err(map_sql_error)?;
            {
                let mut insert = tx.prepare(&sql.insert).map_err(map_sql_error)?;
                for row in &records {
                    execute_row(&mut insert, row).map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(deleted)
        })
        .await
    }
}

/// Bind a record in column order (insert and update share it).
fn execute_row(stmt: &mut Statement<'_>, row: &Negotiation) -> rusqlite::Result<usize> {
    stmt.execute(params![
        row.crm_id,
        row.created_at,
        row.recurring_value,
        row.non_recurring_value,
        row.predicted_close_date,
        row.status.label(),
        row.funnel,
        row.funnel_order,
        row.stage,
        row.stage_order,
        row.closed_at,
    ])
}

fn negotiation_from_row(row: &Row<'_>) -> rusqlite::Result<Negotiation> {
    let status: String = row.get(5)?;
    let status = status.parse::<NegotiationStatus>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(DealSyncError::InvalidInput(err)))
    })?;

    Ok(Negotiation {
        crm_id: row.get(0)?,
        created_at: row.get(1)?,
        recurring_value: row.get(2)?,
        non_recurring_value: row.get(3)?,
        predicted_close_date: row.get(4)?,
        status,
        funnel: row.get(6)?,
        funnel_order: row.get(7)?,
        stage: row.get(8)?,
        stage_order: row.get(9)?,
        closed_at: row.get(10)?,
    })
}

fn map_sql_error(err: rusqlite::Error) -> DealSyncError {
    DealSyncError::from(InfraError::from(err))
}

fn map_join_error(err: task::JoinError) -> DealSyncError {
    DealSyncError::Internal(format!("sqlite task failed: {err}"))
}
