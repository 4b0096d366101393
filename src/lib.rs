//! # Species Harvester Library
//!
//! Harvests community-contributed species observations and their photographs
//! from the iNaturalist observation API, stores the images per species on
//! local disk and keeps a licensing/attribution ledger for every photo.
//!
//! ## Architecture
//!
//! - [`fetcher`] - Rate-limited observation page queries and taxon lookup
//! - [`downloader`] - Rate limiter, image downloads, per-species processing and
//!   the orchestrator that fans out across all species
//! - [`output`] - Species directory layout, the attribution ledger and the
//!   filename renumbering utility
//! - [`species`] - Species table loading and slug derivation
//! - [`config`] - Static configuration loaded once at startup
//! - [`cli`] - Command-line front end
//!
//! ## Quick Start
//!
//! ```no_run
//! use species_harvester::config::HarvestConfig;
//! use species_harvester::downloader::Harvester;
//! use species_harvester::SpeciesEntry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig::default();
//! let species = vec![SpeciesEntry::new("Northern Cardinal", 9083)];
//!
//! let harvester = Harvester::new(config)?;
//! let report = harvester.run(&species).await?;
//! println!("{} photos recorded in {}", report.total_records, report.ledger_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//!
//! Every species is processed concurrently over one shared HTTP client. All
//! observation page requests go through a single [`downloader::RateLimiter`]
//! permit that also holds the post-request cooldown, so at most one page
//! request is in flight at any time. Image downloads bypass the limiter and
//! are bounded by a shared download semaphore instead.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};

/// CLI command implementations
pub mod cli;

/// Static configuration
pub mod config;

/// Download orchestration
pub mod downloader;

/// Observation API clients
pub mod fetcher;

/// Ledger and filesystem output
pub mod output;

/// Species table and slugs
pub mod species;

pub use species::{species_slug, SpeciesEntry};

/// Substring identifying the thumbnail size in a photo URL
pub const THUMBNAIL_SIZE_TOKEN: &str = "square";

/// Substring identifying the medium size in a photo URL
pub const MEDIUM_SIZE_TOKEN: &str = "medium";

/// License code recorded when the API omits one
pub const UNKNOWN_LICENSE: &str = "unknown";

/// One page of observation search results
///
/// `results` is `None` when the response carried no `results` key at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObservationPage {
    /// Observations on this page, in API order
    #[serde(default)]
    pub results: Option<Vec<Observation>>,
}

/// A single user-submitted sighting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Observation ID assigned by the API
    #[serde(default)]
    pub id: Option<u64>,
    /// Species name as guessed by the observer
    #[serde(default)]
    pub species_guess: Option<String>,
    /// Attached photos, in API order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub photos: Vec<PhotoRef>,
}

/// Reference to a photo attached to an observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoRef {
    /// Thumbnail-sized photo URL
    #[serde(default)]
    pub url: Option<String>,
    /// License code (e.g. "cc-by"); `null` for all-rights-reserved photos
    #[serde(default)]
    pub license_code: Option<String>,
    /// Human-readable attribution line
    #[serde(default)]
    pub attribution: Option<String>,
}

impl PhotoRef {
    /// The photo URL, if present and non-empty
    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Rewrite a thumbnail photo URL to its medium-resolution variant
pub fn medium_url(photo_url: &str) -> String {
    photo_url.replace(THUMBNAIL_SIZE_TOKEN, MEDIUM_SIZE_TOKEN)
}

/// Licensing and attribution entry for one discovered photo
///
/// Field order is the ledger column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicensingRecord {
    /// Observation the photo belongs to (empty when the API gave no ID)
    pub observation_id: Option<u64>,
    /// Species guess recorded on the observation
    pub species: String,
    /// Original thumbnail URL
    pub photo_url: String,
    /// Medium-resolution URL that was downloaded
    pub medium_url: String,
    /// License code
    pub license_code: String,
    /// Local filename inside the species directory
    pub filename: String,
    /// Attribution line
    pub attribution: String,
}

impl LicensingRecord {
    /// Build the record for a photo found on `observation`
    pub fn from_photo(observation: &Observation, photo: &PhotoRef, photo_url: &str, filename: String) -> Self {
        Self {
            observation_id: observation.id,
            species: observation.species_guess.clone().unwrap_or_default(),
            photo_url: photo_url.to_string(),
            medium_url: medium_url(photo_url),
            license_code: photo
                .license_code
                .clone()
                .unwrap_or_else(|| UNKNOWN_LICENSE.to_string()),
            filename,
            attribution: photo.attribution.clone().unwrap_or_default(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
