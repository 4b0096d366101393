//! Per-species harvesting
//!
//! Fetches every configured page for one species, turns the photos found into
//! download tasks and licensing records, then downloads them. Image indices
//! follow discovery order (page order, then observation order, then photo
//! order), so identical API responses always yield identical filenames.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::image::{DownloadTally, DownloadTask, ImageDownloader};
use super::DownloadError;
use crate::config::HarvestConfig;
use crate::fetcher::{ObservationClient, PageQuery};
use crate::output::SpeciesLayout;
use crate::{LicensingRecord, ObservationPage, SpeciesEntry};

/// Counts reported for one species
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesSummary {
    /// Species display name
    pub name: String,
    /// Directory slug
    pub slug: String,
    /// Photos discovered (one ledger row each)
    pub photos: usize,
    /// Pages that could not be fetched
    pub pages_failed: usize,
    /// Download outcomes
    pub downloads: DownloadTally,
}

/// Everything one species contributes to a run
#[derive(Debug, Clone)]
pub struct SpeciesHarvest {
    /// Licensing records in discovery order
    pub records: Vec<LicensingRecord>,
    /// Counts for reporting
    pub summary: SpeciesSummary,
}

/// Walk fetched pages in order and assign sequential filenames
///
/// Pages without a `results` key and photos without a URL contribute nothing.
/// Returns one download task and one licensing record per photo, in the same
/// order.
pub fn collect_photos(
    layout: &SpeciesLayout,
    pages: &[ObservationPage],
) -> (Vec<DownloadTask>, Vec<LicensingRecord>) {
    let mut tasks = Vec::new();
    let mut records = Vec::new();
    let mut next_index = 1;

    let observations = pages
        .iter()
        .filter_map(|page| page.results.as_deref())
        .flatten();

    for observation in observations {
        for photo in &observation.photos {
            let Some(photo_url) = photo.source_url() else {
                continue;
            };

            let filename = layout.image_filename(next_index);
            let record = LicensingRecord::from_photo(observation, photo, photo_url, filename);
            tasks.push(DownloadTask {
                source_url: record.medium_url.clone(),
                destination: layout.image_path(&record.filename),
            });
            records.push(record);
            next_index += 1;
        }
    }

    (tasks, records)
}

/// Processes one species at a time against shared run resources
pub struct SpeciesProcessor<'a> {
    config: &'a HarvestConfig,
    fetcher: &'a ObservationClient,
    downloader: &'a ImageDownloader,
    download_slots: &'a Semaphore,
}

impl<'a> SpeciesProcessor<'a> {
    /// Create a processor
    ///
    /// # Arguments
    /// * `config` - Run configuration (pages, filters, output root)
    /// * `fetcher` - Observation client holding the shared rate limiter
    /// * `downloader` - Image downloader on the shared HTTP client
    /// * `download_slots` - Run-wide cap on simultaneous downloads
    pub fn new(
        config: &'a HarvestConfig,
        fetcher: &'a ObservationClient,
        downloader: &'a ImageDownloader,
        download_slots: &'a Semaphore,
    ) -> Self {
        Self {
            config,
            fetcher,
            downloader,
            download_slots,
        }
    }

    /// Harvest one species
    ///
    /// # Errors
    /// Fails only when the species directory cannot be created. Page and
    /// download failures are logged and counted instead.
    pub async fn process(&self, species: &SpeciesEntry) -> Result<SpeciesHarvest, DownloadError> {
        let layout = SpeciesLayout::new(&self.config.raw_data_path, &species.name);
        layout.ensure_dir().await?;

        let pages = self.fetch_pages(species).await;
        let pages_failed = self.config.pages_to_fetch as usize - pages.len();

        let (tasks, records) = collect_photos(&layout, &pages);
        info!("{}: Total images queued for download: {}", species.name, tasks.len());

        let downloads = self.download_all(&tasks).await;
        debug!(
            species = %species.name,
            saved = downloads.saved,
            rejected = downloads.rejected,
            failed = downloads.failed,
            "Species downloads finished"
        );

        Ok(SpeciesHarvest {
            summary: SpeciesSummary {
                name: species.name.clone(),
                slug: layout.slug().to_string(),
                photos: records.len(),
                pages_failed,
                downloads,
            },
            records,
        })
    }

    /// Fetch all pages concurrently; failed pages are dropped, order is kept
    async fn fetch_pages(&self, species: &SpeciesEntry) -> Vec<ObservationPage> {
        let queries = PageQuery::pages(self.config, species.taxon_id, self.config.pages_to_fetch);
        let results = join_all(queries.iter().map(|query| self.fetcher.fetch_page(query))).await;

        queries
            .iter()
            .zip(results)
            .filter_map(|(query, result)| match result {
                Ok(page) => {
                    if page.results.is_none() {
                        debug!("{}: page {} has no results key", species.name, query.page);
                    }
                    Some(page)
                }
                Err(e) => {
                    warn!("{}: skipping page {}: {}", species.name, query.page, e);
                    None
                }
            })
            .collect()
    }

    async fn download_all(&self, tasks: &[DownloadTask]) -> DownloadTally {
        let this = self;
        stream::iter(tasks)
            .map(move |task| async move {
                // Never closed; a closed semaphore would only lift the cap
                let _slot = this.download_slots.acquire().await.ok();
                this.downloader.download(task).await
            })
            .buffer_unordered(self.config.max_concurrent_downloads)
            .fold(DownloadTally::default(), |mut tally, outcome| async move {
                tally.record(&outcome);
                tally
            })
            .await
    }
}
