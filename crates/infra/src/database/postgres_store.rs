//! PostgreSQL-backed negotiation store.
//!
//! The table is expected to exist. Parameters are cast explicitly so the
//! store works whether value columns are `numeric` or `double precision`.

use async_trait::async_trait;
use dealsync_core::{ChangeSet, NegotiationStore};
use dealsync_domain::{DealSyncError, Negotiation, NegotiationStatus, Result as DomainResult};
use tokio_postgres::types::ToSql;
use tokio_postgres::{Row, Statement, Transaction};
use tracing::{debug, warn};

use super::postgres_session::PgSession;
use super::table::{Dialect, TableName};
use crate::errors::InfraError;

/// PostgreSQL implementation of [`NegotiationStore`].
pub struct PostgresNegotiationStore {
    session: PgSession,
    table: TableName,
    select_all: String,
    insert: String,
    update: String,
    delete: String,
    delete_all: String,
}

impl PostgresNegotiationStore {
    /// Store over an existing `table`; statements are rendered once.
    pub fn new(session: PgSession, table: TableName) -> Self {
        Self {
            select_all: table.select_all_sql(Dialect::Postgres),
            insert: table.insert_sql(Dialect::Postgres),
            update: table.update_sql(Dialect::Postgres),
            delete: table.delete_sql(Dialect::Postgres),
            delete_all: table.delete_all_sql(),
            session,
            table,
        }
    }

    /// Target table.
    pub fn table(&self) -> &TableName {
        &self.table
    }
}

#[async_trait]
impl NegotiationStore for PostgresNegotiationStore {
    async fn load_all(&self) -> DomainResult<Vec<Negotiation>> {
        let client = self.session.lock().await?;
        let rows = client.query(self.select_all.as_str(), &[]).await.map_err(InfraError::from)?;
        debug!(table = %self.table.quoted(), rows = rows.len(), "Loaded persisted negotiations");
        rows.iter().map(negotiation_from_row).collect()
    }

    async fn apply(&self, changes: &ChangeSet) -> DomainResult<()> {
        let mut client = self.session.lock().await?;
        let tx = client.transaction().await.map_err(InfraError::from)?;

        if !changes.deletes.is_empty() {
            let deleted = tx.execute(self.delete.as_str(), &[&changes.deletes]).await.map_err(InfraError::from)?;
            debug!(deleted, "Deleted stale negotiations");
        }

        if !changes.updates.is_empty() {
            let update = tx.prepare(&self.update).await.map_err(InfraError::from)?;
            for row in &changes.updates {
                if execute_row(&tx, &update, row).await? == 0 {
                    warn!(crm_id = %row.crm_id, "Update matched no row");
                }
            }
        }

        if !changes.inserts.is_empty() {
            let insert = tx.prepare(&self.insert).await.map_err(InfraError::from)?;
            for row in &changes.inserts {
                execute_row(&tx, &insert, row).await?;
            }
        }

        // Dropping the transaction on any error above rolls it back.
        tx.commit().await.map_err(InfraError::from)?;
        Ok(())
    }

    async fn replace_all(&self, records: &[Negotiation]) -> DomainResult<usize> {
        let mut client = self.session.lock().await?;
        let tx = client.transaction().await.map_err(InfraError::from)?;

        let deleted = tx.execute(self.delete_all.as_str(), &[]).await.map_err(InfraError::from)?;
        let insert = tx.prepare(&self.insert).await.map_err(InfraError::from)?;
        for row in records {
            execute_row(&tx, &insert, row).await?;
        }

        tx.commit().await.map_err(InfraError::from)?;
        usize::try_from(deleted)
            .map_err(|_| DealSyncError::Database(format!("deleted row count {deleted} out of range")))
    }
}

/// Bind a record in column order (insert and update share it).
async fn execute_row(tx: &Transaction<'_>, stmt: &Statement, row: &Negotiation) -> DomainResult<u64> {
    let status = row.status.label();
    let params: [&(dyn ToSql + Sync); 11] = [
        &row.crm_id,
        &row.created_at,
        &row.recurring_value,
        &row.non_recurring_value,
        &row.predicted_close_date,
        &status,
        &row.funnel,
        &row.funnel_order,
        &row.stage,
        &row.stage_order,
        &row.closed_at,
    ];
    Ok(tx.execute(stmt, &params).await.map_err(InfraError::from)?)
}

fn negotiation_from_row(row: &Row) -> DomainResult<Negotiation> {
    let status: String = row.try_get(5).map_err(InfraError::from)?;
    let status = status.parse::<NegotiationStatus>().map_err(DealSyncError::Database)?;

    Ok(Negotiation {
        crm_id: row.try_get(0).map_err(InfraError::from)?,
        created_at: row.try_get(1).map_err(InfraError::from)?,
        recurring_value: row.try_get(2).map_err(InfraError::from)?,
        non_recurring_value: row.try_get(3).map_err(InfraError::from)?,
        predicted_close_date: row.try_get(4).map_err(InfraError::from)?,
        status,
        funnel: row.try_get(6).map_err(InfraError::from)?,
        funnel_order: row.try_get(7).map_err(InfraError::from)?,
        stage: row.try_get(8).map_err(InfraError::from)?,
        stage_order: row.try_get(9).map_err(InfraError::from)?,
        closed_at: row.try_get(10).map_err(InfraError::from)?,
    })
}
