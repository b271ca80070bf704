#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use dealsync_domain::{Negotiation, NegotiationStatus, PostgresConfig, SslMode};
use dealsync_infra::database::{PgSession, PostgresNegotiationStore, SqliteNegotiationStore, TableName};
use dealsync_infra::http::HttpClient;
use dealsync_infra::integrations::RdStationClient;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "integration-token";

/// Route test logs through the harness's captured output. `RUST_LOG` applies.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Temporary SQLite store that keeps its file alive for the test.
pub struct TestDatabase {
    pub store: Arc<SqliteNegotiationStore>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let table = TableName::new(Some("comercial"), "negociacoes").expect("valid table");
        let store = SqliteNegotiationStore::open(temp_dir.path().join("deals.db"), &table, 2)
            .expect("store should open");

        Self { store: Arc::new(store), _temp_dir: temp_dir }
    }
}

/// Scratch table on a live PostgreSQL server.
///
/// Postgres tests run only when `DEALSYNC_TEST_PG` is set; connection
/// parameters come from the usual `PGHOST`, `PGPORT`, `PGUSER`,
/// `PGPASSWORD` and `PGDATABASE` variables.
pub struct TestPostgres {
    pub config: PostgresConfig,
    pub session: PgSession,
    pub store: Arc<PostgresNegotiationStore>,
    pub table: TableName,
}

impl TestPostgres {
    pub async fn from_env() -> Option<Self> {
        std::env::var("DEALSYNC_TEST_PG").ok()?;
        init_tracing();

        let defaults = PostgresConfig::default();
        let config = PostgresConfig {
            host: std::env::var("PGHOST").unwrap_or(defaults.host),
            port: std::env::var("PGPORT").ok().and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            user: std::env::var("PGUSER").unwrap_or(defaults.user),
            password: std::env::var("PGPASSWORD").ok(),
            dbname: std::env::var("PGDATABASE").unwrap_or(defaults.dbname),
            sslmode: SslMode::Disable,
            connect_timeout_secs: 5,
        };
        let session = PgSession::connect(&config).await.expect("postgres should be reachable");

        let name = format!("negociacoes_{}", uuid::Uuid::now_v7().simple());
        let table = TableName::new(None, &name).expect("valid table");
        session
            .lock()
            .await
            .expect("session")
            .batch_execute(&format!(
                "CREATE TABLE {} (
                    crm_id text PRIMARY KEY,
                    criada_em timestamptz NOT NULL,
                    valor_recorrente numeric(14, 2),
                    valor_nao_recorrente numeric(14, 2),
                    previsao_fechamento date,
                    status text NOT NULL,
                    funil text NOT NULL,
                    ordem_funil integer NOT NULL,
                    estagio text NOT NULL,
                    ordem_estagio integer NOT NULL,
                    data_fechamento timestamptz
                )",
                table.quoted()
            ))
            .await
            .expect("scratch table should be created");

        let store = Arc::new(PostgresNegotiationStore::new(session.clone(), table.clone()));
        Some(Self { config, session, store, table })
    }

    /// A second, independent session (another process, as far as the server knows).
    pub async fn other_session(&self) -> PgSession {
        PgSession::connect(&self.config).await.expect("second session")
    }

    pub async fn drop_table(self) {
        let client = self.session.lock().await.expect("session");
        let _ = client.batch_execute(&format!("DROP TABLE IF EXISTS {}", self.table.quoted())).await;
    }
}

pub fn negotiation(id: &str) -> Negotiation {
    Negotiation {
        crm_id: id.into(),
        created_at: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        recurring_value: Some(100.0),
        non_recurring_value: None,
        predicted_close_date: NaiveDate::from_ymd_opt(2025, 4, 30),
        status: NegotiationStatus::InProgress,
        funnel: "Vendas".into(),
        funnel_order: 1,
        stage: "Contato".into(),
        stage_order: 1,
        closed_at: None,
    }
}

pub fn rdstation(server: &MockServer) -> RdStationClient {
    let http = HttpClient::builder()
        .base_backoff(Duration::from_millis(5))
        .max_attempts(2)
        .build()
        .expect("http client");
    RdStationClient::new(http, &format!("{}/api/v1", server.uri()), TOKEN.into())
}

pub fn deal_json(id: &str, stage_id: &str, win: Option<bool>) -> Value {
    json!({
        "id": id,
        "created_at": "2025-03-10T09:00:00.000-03:00",
        "amount_montly": 250.0,
        "amount_unique": 1000.0,
        "prediction_date": "2025-04-30",
        "win": win,
        "deal_stage": { "id": stage_id, "name": null },
        "closed_at": if win == Some(true) { json!("2025-11-20T17:45:00.000-03:00") } else { Value::Null }
    })
}

pub async fn mount_funnels(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/deal_pipelines"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "f1",
                "name": "Vendas",
                "order": 1,
                "deal_stages": [
                    { "id": "s1", "name": "Contato", "order": 1 },
                    { "id": "s2", "name": "Proposta", "order": 2 }
                ]
            },
            {
                "id": "f2",
                "name": "Renovação",
                "order": 2,
                "deal_stages": [
                    { "id": "s3", "name": "Negociação", "order": 1 }
                ]
            }
        ])))
        .mount(server)
        .await;
}

/// Mount one page of deals for the filter identified by its `win` value.
pub async fn mount_deal_page(
    server: &MockServer,
    win: &str,
    page: u32,
    deals: Vec<Value>,
    has_more: bool,
) {
    Mock::given(method("GET"))
        .and(path("/api/v1/deals"))
        .and(query_param("win", win))
        .and(query_param("page", page.to_string()))
        .and(query_param("token", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "deals": deals, "has_more": has_more })),
        )
        .mount(server)
        .await;
}
