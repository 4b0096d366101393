//! Taxon lookup: species display name to taxon ID

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::fetcher::{FetcherError, FetcherResult};

#[derive(Debug, Deserialize)]
struct TaxaResponse {
    #[serde(default)]
    results: Vec<TaxonMatch>,
}

#[derive(Debug, Deserialize)]
struct TaxonMatch {
    id: u64,
}

/// Resolves species names against the taxon search endpoint
pub struct TaxonResolver {
    client: Client,
    endpoint: String,
}

impl TaxonResolver {
    /// Create a resolver for the given taxon search URL
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Best-matching species-rank taxon ID for `name`
    ///
    /// Returns `Ok(None)` when the search has no results.
    pub async fn resolve(&self, name: &str) -> FetcherResult<Option<u64>> {
        debug!("Resolving taxon for '{}'", name);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", name), ("rank", "species"), ("per_page", "1")])
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let taxa: TaxaResponse = response
            .json()
            .await
            .map_err(|e| FetcherError::ParseError(e.to_string()))?;

        Ok(taxa.results.first().map(|taxon| taxon.id))
    }

    /// Resolve names one at a time, pausing `interval` between lookups
    ///
    /// Failed lookups are logged and yield `None`; the result has one entry
    /// per input name, in order.
    pub async fn resolve_all(&self, names: &[&str], interval: Duration) -> Vec<Option<u64>> {
        let mut ids = Vec::with_capacity(names.len());

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                ids.push(None);
                continue;
            }
            if i > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }

            let id = match self.resolve(name).await {
                Ok(Some(id)) => {
                    info!("Resolved '{}' to taxon {}", name, id);
                    Some(id)
                }
                Ok(None) => {
                    warn!("No taxon found for '{}'", name);
                    None
                }
                Err(e) => {
                    warn!("Taxon lookup failed for '{}': {}", name, e);
                    None
                }
            };
            ids.push(id);
        }

        ids
    }
}
