//! Retrying GET client for the CRM API
//!
//! Every call is a GET rebuilt from its URL and query pairs on each attempt.
//! Connect errors, timeouts and 5xx responses back off exponentially. A 429
//! is retried only when the server names a `Retry-After` no longer than
//! `max_retry_after`; otherwise the response goes back to the caller.

use std::time::Duration;

use dealsync_domain::constants::{DEFAULT_HTTP_MAX_ATTEMPTS, DEFAULT_HTTP_TIMEOUT_SECS};
use dealsync_domain::DealSyncError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// GET-only HTTP client with retry, backoff and query-free request logging.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
    max_retry_after: Duration,
}

impl HttpClient {
    /// Start from the default timeout and attempt budget.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// GET `url` with `query` appended, retrying transient failures.
    ///
    /// Non-retryable statuses (and the last attempt's status) are returned
    /// as a `Response`; mapping them to errors is the caller's job.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, DealSyncError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            let request = self
                .client
                .get(url)
                .query(query)
                .build()
                .map_err(|err| DealSyncError::from(InfraError::from(err.without_url())))?;
            let log_url = without_query(request.url());
            let final_attempt = attempt == attempts;
            debug!(attempt, url = %log_url, "GET");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, url = %log_url, %status, "GET response");

                    match self.retry_delay(&response, attempt) {
                        Some(delay) if !final_attempt => {
                            warn!(attempt, url = %log_url, %status, delay = ?delay, "Retrying CRM request");
                            tokio::time::sleep(delay).await;
                        }
                        _ => return Ok(response),
                    }
                }
                Err(err) => {
                    let err = err.without_url();
                    debug!(attempt, url = %log_url, error = %err, "GET failed");

                    if final_attempt || !is_transient(&err) {
                        return Err(InfraError::from(err).into());
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(attempt, url = %log_url, error = %err, delay = ?delay, "Retrying CRM request");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(DealSyncError::Internal("http client exhausted retries without producing a result".into()))
    }

    fn retry_delay(&self, response: &Response, attempt: usize) -> Option<Duration> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            retry_after(response).filter(|delay| *delay <= self.max_retry_after)
        } else if status.is_server_error() {
            Some(self.backoff_delay(attempt))
        } else {
            None
        }
    }

    /// `base_backoff * 2^(attempt - 1)`, capped at eight doublings.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1).min(8)).unwrap_or(8);
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    max_retry_after: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(200),
            max_retry_after: Duration::from_secs(10),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts, first try included.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; doubles per attempt.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Longest `Retry-After` worth waiting for inside one run.
    pub fn max_retry_after(mut self, limit: Duration) -> Self {
        self.max_retry_after = limit;
        self
    }

    /// `User-Agent` header for every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the underlying reqwest client.
    pub fn build(self) -> Result<HttpClient, DealSyncError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|err| DealSyncError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
            max_retry_after: self.max_retry_after,
        })
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Render a URL for logs with the query string (and its token) dropped.
pub(crate) fn without_query(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
