//! Shared PostgreSQL session
//!
//! One `tokio_postgres::Client` behind an async mutex, shared by the store and
//! the advisory lock. Session-level advisory locks are tied to this
//! connection, so both must use the same one.
//!
//! A closed connection (server restart, failover, idle kill) is replaced on
//! the next [`PgSession::lock`]. The server drops a dead session's advisory
//! locks with it, so the fresh connection starts with none held.

use std::sync::Arc;
use std::time::Duration;

use dealsync_domain::{DealSyncError, PostgresConfig, Result as DomainResult, SslMode};
use postgres_native_tls::MakeTlsConnector;
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::config::SslMode as PgSslMode;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{error, info, warn};

use crate::errors::InfraError;

/// A connected PostgreSQL session.
#[derive(Clone)]
pub struct PgSession {
    config: Arc<PostgresConfig>,
    client: Arc<Mutex<Client>>,
}

impl PgSession {
    /// Connect using libpq-style parameters.
    ///
    /// `disable` connects in plain text; `prefer` and `require` negotiate TLS
    /// through the platform's native TLS stack.
    pub async fn connect(config: &PostgresConfig) -> DomainResult<Self> {
        let client = open_client(config).await?;
        info!(
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            sslmode = %config.sslmode,
            "postgres session established"
        );
        Ok(Self { config: Arc::new(config.clone()), client: Arc::new(Mutex::new(client)) })
    }

    /// Exclusive access to the client for the duration of the guard,
    /// reconnecting first if the connection has closed.
    pub async fn lock(&self) -> DomainResult<MutexGuard<'_, Client>> {
        let mut client = self.client.lock().await;
        if client.is_closed() {
            warn!(
                host = %self.config.host,
                dbname = %self.config.dbname,
                "postgres connection closed; reconnecting"
            );
            *client = open_client(&self.config).await?;
            info!(host = %self.config.host, "postgres session re-established");
        }
        Ok(client)
    }
}

async fn open_client(config: &PostgresConfig) -> DomainResult<Client> {
    let pg_config = pg_config(config);

    let client = match config.sslmode {
        SslMode::Disable => {
            let (client, connection) = pg_config.connect(NoTls).await.map_err(InfraError::from)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(error = %err, "postgres connection terminated");
                }
            });
            client
        }
        SslMode::Prefer | SslMode::Require => {
            let connector = native_tls::TlsConnector::builder()
                .build()
                .map_err(|err| DealSyncError::Config(format!("TLS setup failed: {err}")))?;
            let (client, connection) = pg_config
                .connect(MakeTlsConnector::new(connector))
                .await
                .map_err(InfraError::from)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(error = %err, "postgres connection terminated");
                }
            });
            client
        }
    };
    Ok(client)
}

fn pg_config(config: &PostgresConfig) -> PgConfig {
    let mut pg = PgConfig::new();
    pg.host(&config.host)
        .port(config.port)
        .user(&config.user)
        .dbname(&config.dbname)
        .application_name("dealsync")
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .ssl_mode(match config.sslmode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        });
    if let Some(password) = &config.password {
        pg.password(password);
    }
    pg
}
