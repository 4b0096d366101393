//! Download orchestration and rate limiting
//!
//! # Overview
//!
//! A harvest run flows through four layers:
//!
//! 1. **Orchestration**: [`orchestrator::Harvester`] processes every species
//!    concurrently over one shared HTTP client and merges their licensing
//!    records into the ledger.
//! 2. **Per-species processing**: [`species::SpeciesProcessor`] fetches the
//!    configured observation pages, assigns image filenames in discovery order
//!    and drives the downloads.
//! 3. **Rate limiting**: every observation page request holds the single
//!    [`rate_limit::RateLimiter`] permit, cooldown included.
//! 4. **Image downloads**: [`image::ImageDownloader`] saves one photo and never
//!    fails its caller; outcomes are tallied instead.
//!
//! # Error Handling
//!
//! A failed page is logged and skipped, a failed download is logged and
//! counted, and a species that cannot be set up (e.g. its directory cannot be
//! created) is reported without stopping the other species. Only a ledger
//! write failure fails the run.

pub mod config;
pub mod image;
pub mod orchestrator;
pub mod rate_limit;
pub mod species;

pub use image::{DownloadOutcome, DownloadTally, DownloadTask, ImageDownloader};
pub use orchestrator::{HarvestReport, Harvester, SpeciesFailure};
pub use rate_limit::{RateLimitError, RateLimiter};
pub use species::{SpeciesHarvest, SpeciesProcessor, SpeciesSummary};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] crate::fetcher::FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] crate::output::OutputError),
}
