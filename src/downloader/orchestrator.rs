//! Harvest orchestrator
//!
//! Runs every species concurrently on one HTTP client and one rate limiter,
//! merges their licensing records as each species completes, and writes the
//! attribution ledger.

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::image::ImageDownloader;
use super::rate_limit::RateLimiter;
use super::species::{SpeciesProcessor, SpeciesSummary};
use super::DownloadError;
use crate::config::HarvestConfig;
use crate::fetcher::{build_http_client, ObservationClient};
use crate::output::write_ledger;
use crate::{LicensingRecord, SpeciesEntry};

/// A species that could not be harvested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesFailure {
    /// Species display name
    pub name: String,
    /// What went wrong
    pub reason: String,
}

/// Outcome of a harvest run
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    /// Where the ledger was written
    pub ledger_path: PathBuf,
    /// Ledger rows written
    pub total_records: usize,
    /// Per-species counts, in completion order
    pub species: Vec<SpeciesSummary>,
    /// Species that failed before any work was done
    pub failures: Vec<SpeciesFailure>,
    /// Merged ledger rows, in completion order
    #[serde(skip)]
    pub records: Vec<LicensingRecord>,
}

/// Drives a full harvest over a list of species
pub struct Harvester {
    config: HarvestConfig,
    client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl Harvester {
    /// Create a harvester with its own HTTP client and rate limiter
    ///
    /// # Errors
    /// Returns an error when the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: HarvestConfig) -> Result<Self, DownloadError> {
        config
            .validate()
            .map_err(|e| DownloadError::ConfigError(e.to_string()))?;
        let client = build_http_client(&config)?;
        let rate_limiter = Arc::new(RateLimiter::new(config.api_request_interval()));

        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    /// Run configuration
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvest every species and write the ledger
    ///
    /// Records keep their per-species order; species appear in the order they
    /// finish.
    ///
    /// # Errors
    /// Fails only when the ledger cannot be written.
    pub async fn run(&self, species: &[SpeciesEntry]) -> Result<HarvestReport, DownloadError> {
        info!(
            "Harvesting {} species, {} page(s) each, {:?} cooldown between page requests",
            species.len(),
            self.config.pages_to_fetch,
            self.rate_limiter.cooldown()
        );

        let fetcher =
            ObservationClient::from_config(self.client.clone(), &self.config, self.rate_limiter.clone());
        let downloader = ImageDownloader::new(self.client.clone());
        let download_slots = Semaphore::new(self.config.max_concurrent_downloads);
        let processor = SpeciesProcessor::new(&self.config, &fetcher, &downloader, &download_slots);

        let processor = &processor;
        let mut pending: FuturesUnordered<_> = species
            .iter()
            .map(|entry| async move { (entry, processor.process(entry).await) })
            .collect();

        let mut records = Vec::new();
        let mut summaries = Vec::new();
        let mut failures = Vec::new();

        while let Some((entry, result)) = pending.next().await {
            match result {
                Ok(harvest) => {
                    records.extend(harvest.records);
                    summaries.push(harvest.summary);
                }
                Err(e) => {
                    error!("{}: species failed: {}", entry.name, e);
                    failures.push(SpeciesFailure {
                        name: entry.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let ledger_path = self.config.ledger_path();
        write_ledger(&ledger_path, &records)?;
        info!("Licensing metadata saved to {}", ledger_path.display());

        Ok(HarvestReport {
            ledger_path,
            total_records: records.len(),
            species: summaries,
            failures,
            records,
        })
    }
}
