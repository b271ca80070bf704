//! Database implementations

pub mod advisory_lock;
pub mod postgres_session;
pub mod postgres_store;
pub mod sqlite_store;
pub mod table;

pub use advisory_lock::PgAdvisoryLock;
pub use postgres_session::PgSession;
pub use postgres_store::PostgresNegotiationStore;
pub use sqlite_store::SqliteNegotiationStore;
pub use table::{Dialect, TableName};
