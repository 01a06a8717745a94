//! REST client for the enrichment web backend
//!
//! Implements every collaborator trait over HTTP/JSON, retrying transient
//! failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{BackendError, BatchLauncher, JobStatusSource, ListingRefresher, PriorityClassifier, Recalculator};
use crate::config::BackendConfig;
use crate::domain::{JobStatusReport, Mode, PriorityReport};

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Wait used when a 429 carries no usable Retry-After
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

const PRIORITIES_PATH: &str = "/api/scan-priority/calculate";
const BATCH_PATH: &str = "/api/enrichment/batch";
const RECALCULATE_PATH: &str = "/api/scoring/recalculate";
const RECALCULATE_ALL_PATH: &str = "/api/scoring/recalculate-all";
const LISTINGS_REFRESH_PATH: &str = "/api/listings/refresh";

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    #[serde(rename = "jobId", alias = "job_id")]
    job_id: String,
}

/// HTTP implementation of the backend collaborators
pub struct HttpBackend {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpBackend {
    /// Create a new client from configuration
    ///
    /// The bearer token is read from the environment variable named in config;
    /// an unset variable means unauthenticated requests.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(BackendError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body, retrying up to `retries` times.
    ///
    /// Only errors that report themselves retryable are retried. A rate
    /// limit waits for the server's Retry-After; everything else backs off
    /// exponentially.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        retries: u32,
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        debug!(%method, %url, "request: called");

        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), &url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < retries && e.is_retryable() => {
                    let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                    let wait = e.retry_after().unwrap_or(backoff);
                    attempt += 1;
                    warn!(attempt, wait_ms = wait.as_millis() as u64, %url, error = %e, "request: retrying after transient error");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request/response exchange
    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T, BackendError> {
        let mut builder = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(BackendError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !response.status().is_success() {
            debug!(status, "send_once: API error");
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError { status, message });
        }

        let text = response.text().await?;
        // 204 / empty bodies decode as JSON null
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
impl PriorityClassifier for HttpBackend {
    async fn calculate_all_priorities(&self) -> Result<PriorityReport, BackendError> {
        self.request(Method::GET, PRIORITIES_PATH, None, MAX_RETRIES).await
    }
}

#[async_trait]
impl BatchLauncher for HttpBackend {
    async fn enrich_by_ids(&self, ids: &[i64], mode: Mode) -> Result<String, BackendError> {
        debug!(count = ids.len(), %mode, "enrich_by_ids: called");
        let body = json!({ "ids": ids, "mode": mode });
        // Launching is not idempotent: a retried POST could start a second batch
        let response: LaunchResponse = self.request(Method::POST, BATCH_PATH, Some(&body), 0).await?;
        if response.job_id.is_empty() {
            return Err(BackendError::InvalidResponse("empty jobId".to_string()));
        }
        Ok(response.job_id)
    }
}

#[async_trait]
impl JobStatusSource for HttpBackend {
    async fn get_job_status(&self, job_id: &str) -> Result<JobStatusReport, BackendError> {
        let path = format!("{}/{}", BATCH_PATH, job_id);
        self.request(Method::GET, &path, None, MAX_RETRIES).await
    }
}

#[async_trait]
impl Recalculator for HttpBackend {
    async fn recalculate_touched_since(&self, since: DateTime<Utc>) -> Result<(), BackendError> {
        let body = json!({ "since": since.to_rfc3339() });
        let _: Value = self.request(Method::POST, RECALCULATE_PATH, Some(&body), MAX_RETRIES).await?;
        Ok(())
    }

    async fn recalculate_all_scores(&self) -> Result<(), BackendError> {
        let _: Value = self.request(Method::POST, RECALCULATE_ALL_PATH, None, MAX_RETRIES).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingRefresher for HttpBackend {
    async fn refresh_listings(&self) -> Result<(), BackendError> {
        let _: Value = self.request(Method::POST, LISTINGS_REFRESH_PATH, None, MAX_RETRIES).await?;
        Ok(())
    }
}
