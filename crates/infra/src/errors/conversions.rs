//! Conversions from external infrastructure errors into domain errors.

use dealsync_domain::DealSyncError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio_postgres::Error as PgError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DealSyncError);

impl From<InfraError> for DealSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DealSyncError> for InfraError {
    fn from(value: DealSyncError) -> Self {
        InfraError(value)
    }
}

/// Makes the conversion logic explicit in tests and within this module.
trait IntoDealSyncError {
    fn into_dealsync(self) -> DealSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → DealSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDealSyncError for SqlError {
    fn into_dealsync(self) -> DealSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => DealSyncError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        DealSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        DealSyncError::Database(format!("unique constraint violation: {message}"))
                    }
                    _ => DealSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                DealSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                DealSyncError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => DealSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => DealSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_dealsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → DealSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDealSyncError for PoolError {
    fn into_dealsync(self) -> DealSyncError {
        DealSyncError::Database(format!("connection pool error: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_dealsync())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio_postgres::Error → DealSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDealSyncError for PgError {
    fn into_dealsync(self) -> DealSyncError {
        if let Some(db) = self.as_db_error() {
            return DealSyncError::Database(format!(
                "postgres {} ({}): {}",
                db.severity(),
                db.code().code(),
                db.message()
            ));
        }
        if self.is_closed() {
            return DealSyncError::Database("postgres connection closed".into());
        }
        DealSyncError::Database(format!("postgres error: {self}"))
    }
}

impl From<PgError> for InfraError {
    fn from(value: PgError) -> Self {
        InfraError(value.into_dealsync())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DealSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDealSyncError for HttpError {
    fn into_dealsync(self) -> DealSyncError {
        // The CRM token travels in the query string.
        let err = self.without_url();

        if err.is_timeout() {
            return DealSyncError::Network("HTTP request timed out".into());
        }

        if err.is_connect() {
            return DealSyncError::Network("HTTP connection failure".into());
        }

        if err.is_decode() {
            return DealSyncError::Decode(err.to_string());
        }

        if let Some(status) = err.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => DealSyncError::Auth(message),
                429 => DealSyncError::RateLimited(message),
                _ => DealSyncError::Network(message),
            };
        }

        DealSyncError::Network(err.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_dealsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
