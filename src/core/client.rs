use crate::config::DashboardConfig;
use crate::core::{CountSnapshot, CountSource, FetchOutcome};
use crate::domain::model::BackendStatus;
use crate::utils::error::{DashboardError, Result};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use url::Url;

const RESET_PATH: &str = "/api/reset";
const STATUS_PATH: &str = "/api/status";

/// HTTP client for the people-counting backend.
#[derive(Debug, Clone)]
pub struct HttpCountsClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpCountsClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| DashboardError::InvalidConfigValueError {
                field: "endpoint".to_string(),
                value: endpoint.to_string(),
                reason: format!("Invalid URL format: {}", e),
            })?;

        let client = Client::builder()
            .user_agent(concat!("occupancy-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.request_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET` the counts endpoint.
    pub async fn fetch_snapshot(&self) -> Result<CountSnapshot> {
        tracing::debug!("Making API request to: {}", self.endpoint);
        let request = self.client.get(self.endpoint.clone());
        self.with_deadline(Self::send_json(request)).await
    }

    /// `POST /api/reset` on the backend serving the counts endpoint.
    pub async fn reset(&self) -> Result<CountSnapshot> {
        let url = self.backend_url(RESET_PATH)?;
        tracing::debug!("Resetting counters at: {}", url);
        self.with_deadline(Self::send_json(self.client.post(url)))
            .await
    }

    /// `GET /api/status` on the backend serving the counts endpoint.
    pub async fn status(&self) -> Result<BackendStatus> {
        let url = self.backend_url(STATUS_PATH)?;
        tracing::debug!("Querying backend status at: {}", url);
        self.with_deadline(Self::send_json(self.client.get(url)))
            .await
    }

    fn backend_url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| DashboardError::ConfigError {
                message: format!("cannot derive {} from {}: {}", path, self.endpoint, e),
            })
    }

    async fn with_deadline<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(DashboardError::Timeout(self.timeout)),
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            return Err(DashboardError::Http { status });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl CountSource for HttpCountsClient {
    async fn fetch_counts(&self) -> FetchOutcome {
        match self.fetch_snapshot().await {
            Ok(snapshot) => FetchOutcome::Updated(snapshot),
            Err(e) if e.is_timeout() => FetchOutcome::TimedOut,
            Err(e) => FetchOutcome::Failed(e),
        }
    }
}
