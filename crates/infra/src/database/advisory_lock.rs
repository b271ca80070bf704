//! PostgreSQL session advisory lock
//!
//! Guards runs across processes sharing the database. The lock key is the
//! job name, hashed server-side with `hashtext`.

use async_trait::async_trait;
use dealsync_core::RunLock;
use dealsync_domain::Result as DomainResult;
use tracing::{debug, warn};

use super::postgres_session::PgSession;
use crate::errors::InfraError;

const TRY_LOCK_SQL: &str = "SELECT pg_try_advisory_lock(hashtext($1::text))";
const UNLOCK_SQL: &str = "SELECT pg_advisory_unlock(hashtext($1::text))";

/// [`RunLock`] backed by `pg_try_advisory_lock`.
pub struct PgAdvisoryLock {
    session: PgSession,
}

impl PgAdvisoryLock {
    /// Lock through `session`; share it with the store.
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RunLock for PgAdvisoryLock {
    async fn try_acquire(&self, key: &str) -> DomainResult<bool> {
        let client = self.session.lock().await?;
        let row = client.query_one(TRY_LOCK_SQL, &[&key]).await.map_err(InfraError::from)?;
        let acquired: bool = row.try_get(0).map_err(InfraError::from)?;
        debug!(key, acquired, "postgres advisory lock attempt");
        Ok(acquired)
    }

    async fn release(&self, key: &str) -> DomainResult<()> {
        let client = self.session.lock().await?;
        let row = client.query_one(UNLOCK_SQL, &[&key]).await.map_err(InfraError::from)?;
        let released: bool = row.try_get(0).map_err(InfraError::from)?;
        if !released {
            warn!(key, "postgres advisory lock was not held by this session");
        }
        Ok(())
    }
}
