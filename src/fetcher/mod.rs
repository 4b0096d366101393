//! Observation API clients

use crate::config::{BoundingBox, HarvestConfig};
use reqwest::Client;
use std::time::Duration;

pub mod observation_http;
pub mod taxa;

pub use observation_http::ObservationClient;
pub use taxa::TaxonResolver;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Status code returned
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Rate limiter refused the request
    #[error("rate limiter error: {0}")]
    RateLimitError(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    ClientError(String),
}

impl FetcherError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetcherError::NetworkError(_) => true,
            FetcherError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One observation search request; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    /// Taxon to search
    pub taxon_id: u64,
    /// 1-based page number
    pub page: u32,
    /// Observations per page
    pub per_page: u32,
    /// Comma-separated accepted license codes
    pub license_filter: String,
    /// Geographic filter
    pub bounding_box: BoundingBox,
}

impl PageQuery {
    /// Build the query for `page` of `taxon_id` using the configured filters
    pub fn new(config: &HarvestConfig, taxon_id: u64, page: u32) -> Self {
        Self {
            taxon_id,
            page,
            per_page: config.per_page,
            license_filter: config.license_filter(),
            bounding_box: config.bounding_box,
        }
    }

    /// Queries for pages `1..=pages` of one taxon, in page order
    pub fn pages(config: &HarvestConfig, taxon_id: u64, pages: u32) -> Vec<Self> {
        (1..=pages).map(|page| Self::new(config, taxon_id, page)).collect()
    }

    /// Query string parameters
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("taxon_id", self.taxon_id.to_string()),
            ("photos", "true".to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
            ("photo_license", self.license_filter.clone()),
            ("swlat", self.bounding_box.swlat.to_string()),
            ("swlng", self.bounding_box.swlng.to_string()),
            ("nelat", self.bounding_box.nelat.to_string()),
            ("nelng", self.bounding_box.nelng.to_string()),
        ]
    }
}

/// Build the HTTP client shared by every request in a run
///
/// `reqwest::Client` pools connections internally and is cheap to clone, so
/// one instance backs the page fetcher, the taxon resolver and all downloads.
pub fn build_http_client(config: &HarvestConfig) -> FetcherResult<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| FetcherError::ClientError(e.to_string()))
}
