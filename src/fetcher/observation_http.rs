//! Observation search client
//!
//! Every request attempt runs inside the shared [`RateLimiter`] permit,
//! cooldown included. Transient failures (transport errors, 429, 5xx) are
//! retried with exponential backoff; the backoff sleep happens outside the
//! permit so other species can use the slot meanwhile.

use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HarvestConfig;
use crate::downloader::config::BackoffPolicy;
use crate::downloader::rate_limit::RateLimiter;
use crate::fetcher::{FetcherError, FetcherResult, PageQuery};
use crate::ObservationPage;

/// Longest response body excerpt kept in an error
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the observation search endpoint
pub struct ObservationClient {
    client: Client,
    endpoint: String,
    rate_limiter: Arc<RateLimiter>,
    max_retries: u32,
    backoff: BackoffPolicy,
}

impl ObservationClient {
    /// Create a new observation client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `endpoint` - Observation search URL
    /// * `rate_limiter` - Process-wide page request limiter
    pub fn new(client: Client, endpoint: impl Into<String>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            rate_limiter,
            max_retries: 0,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Create a client using the endpoint and retry settings from `config`
    pub fn from_config(client: Client, config: &HarvestConfig, rate_limiter: Arc<RateLimiter>) -> Self {
        Self::new(client, config.observation_url.clone(), rate_limiter)
            .with_max_retries(config.max_page_retries)
            .with_backoff(BackoffPolicy {
                initial_ms: config.initial_backoff_ms,
                max_ms: config.max_backoff_ms,
            })
    }

    /// Set the number of retries for transient failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the retry backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Endpoint this client queries
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch and parse one page of observations
    ///
    /// # Errors
    /// Returns the last error once retries are exhausted, or immediately for
    /// non-transient failures (4xx other than 429, unparseable body).
    pub async fn fetch_page(&self, query: &PageQuery) -> FetcherResult<ObservationPage> {
        let mut attempt = 0;
        loop {
            let result = self
                .rate_limiter
                .throttle(move || self.request_once(query))
                .await
                .map_err(|e| FetcherError::RateLimitError(e.to_string()))?;

            match result {
                Ok(page) => {
                    debug!(
                        taxon_id = query.taxon_id,
                        page = query.page,
                        "Page fetched on attempt {}",
                        attempt + 1
                    );
                    return Ok(page);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.backoff.delay(attempt);
                    warn!(
                        taxon_id = query.taxon_id,
                        page = query.page,
                        "Page request failed on attempt {}/{}: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, query: &PageQuery) -> FetcherResult<ObservationPage> {
        debug!(taxon_id = query.taxon_id, page = query.page, "GET {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize observation page: {}", e)))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
