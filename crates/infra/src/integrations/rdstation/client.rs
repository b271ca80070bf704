//! RD Station CRM client

use std::time::Duration;

use async_trait::async_trait;
use dealsync_core::DealSource;
use dealsync_domain::{CrmConfig, DealFilter, DealPage, DealSyncError, Funnel, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::InfraError;
use crate::http::HttpClient;

const PIPELINES_PATH: &str = "deal_pipelines";
const DEALS_PATH: &str = "deals";

/// Reads funnels and deals from the RD Station CRM REST API.
///
/// Authenticates with the `token` query parameter on every request.
pub struct RdStationClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
}

impl RdStationClient {
    /// Build a client with its own retrying HTTP client from `config`.
    pub fn from_config(config: &CrmConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .max_attempts(config.max_attempts)
            .user_agent(concat!("dealsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(http_client, &config.base_url, config.token.clone()))
    }

    /// # Arguments
    /// * `http_client` - HTTP client with retry logic
    /// * `base_url` - API root, e.g. `https://crm.rdstation.com/api/v1`
    /// * `token` - CRM API token
    pub fn new(http_client: HttpClient, base_url: &str, token: String) -> Self {
        Self { http_client, base_url: base_url.trim_end_matches('/').to_string(), token }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = response.error_for_status().map_err(InfraError::from)?;
        let body = response.json::<T>().await.map_err(InfraError::from)?;
        Ok(body)
    }
}

#[async_trait]
impl DealSource for RdStationClient {
    async fn fetch_funnels(&self) -> Result<Vec<Funnel>> {
        let response =
            self.http_client.get(&self.endpoint(PIPELINES_PATH), &[("token", self.token.as_str())]).await?;

        let funnels: Vec<Funnel> = Self::decode(response).await?;
        debug!(funnels = funnels.len(), "Fetched deal pipelines");
        Ok(funnels)
    }

    async fn fetch_deal_page(&self, filter: &DealFilter, page: u32, limit: u32) -> Result<DealPage> {
        if page == 0 {
            return Err(DealSyncError::InvalidInput("deal pages are numbered from 1".into()));
        }

        let page_param = page.to_string();
        let limit_param = limit.to_string();
        let mut query: Vec<(&str, &str)> =
            filter.params().iter().map(|(key, value)| (key.as_str(), value.as_str())).collect();
        query.extend([
            ("page", page_param.as_str()),
            ("limit", limit_param.as_str()),
            ("token", self.token.as_str()),
        ]);

        let response = self.http_client.get(&self.endpoint(DEALS_PATH), &query).await?;
        let deal_page: DealPage = Self::decode(response).await?;
        debug!(
            %filter,
            page,
            received = deal_page.deals.len(),
            has_more = deal_page.has_more,
            total = ?deal_page.total,
            "Fetched deal page"
        );
        Ok(deal_page)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> RdStationClient {
        let http = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .expect("http client");
        RdStationClient::new(http, &format!("{}/api/v1/", server.uri()), "tok-123".into())
    }

    fn deal_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "created_at": "2025-03-10T09:12:44.000-03:00",
            "amount_montly": 1200.5,
            "amount_unique": null,
            "prediction_date": "2025-04-30",
            "win": null,
            "deal_stage": { "id": "s1", "name": "Qualificação" },
            "closed_at": null
        })
    }

    #[tokio::test]
    async fn fetches_funnels_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/deal_pipelines"))
            .and(query_param("token", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "f1",
                    "name": "Vendas",
                    "order": 1,
                    "deal_stages": [
                        { "id": "s1", "name": "Qualificação", "order": 1 },
                        { "id": "s2", "name": "Proposta", "order": 2 }
                    ]
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let funnels = client(&server).fetch_funnels().await.unwrap();

        assert_eq!(funnels.len(), 1);
        assert_eq!(funnels[0].deal_stages[1].name, "Proposta");
    }

    #[tokio::test]
    async fn deal_page_carries_filter_paging_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/deals"))
            .and(query_param("win", "null"))
            .and(query_param("page", "3"))
            .and(query_param("limit", "200"))
            .and(query_param("token", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deals": [deal_json("d1"), deal_json("d2")],
                "has_more": true,
                "total": 402
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).fetch_deal_page(&DealFilter::open(), 3, 200).await.unwrap();

        assert_eq!(page.deals.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.total, Some(402));
        assert_eq!(page.deals[0].amount_monthly, Some(1200.5));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_funnels().await.unwrap_err();
        assert!(matches!(err, DealSyncError::Auth(_)));
    }

    #[tokio::test]
    async fn rate_limit_without_retry_after_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_deal_page(&DealFilter::open(), 1, 200).await.unwrap_err();
        assert!(matches!(err, DealSyncError::RateLimited(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deals": "nope" })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_deal_page(&DealFilter::open(), 1, 200).await.unwrap_err();
        assert!(matches!(err, DealSyncError::Decode(_)));
        assert!(!err.to_string().contains("tok-123"));
    }

    #[tokio::test]
    async fn page_zero_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = client(&server).fetch_deal_page(&DealFilter::open(), 0, 200).await.unwrap_err();
        assert!(matches!(err, DealSyncError::InvalidInput(_)));
    }
}
