//! Static harvest configuration
//!
//! Loaded once at startup from an optional TOML file; every key has a default
//! so a partial file (or none at all) is valid.

use crate::downloader::config::{
    DEFAULT_API_REQUEST_INTERVAL_SECS, DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_PAGES_TO_FETCH,
    DEFAULT_PER_PAGE, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_PAGE_RETRIES,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("IO error: {0}")]
    IoError(String),

    /// TOML parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Geographic bounding box applied to every observation query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBox {
    /// South-west latitude
    pub swlat: f64,
    /// South-west longitude
    pub swlng: f64,
    /// North-east latitude
    pub nelat: f64,
    /// North-east longitude
    pub nelng: f64,
}

impl Default for BoundingBox {
    /// Texas
    fn default() -> Self {
        Self {
            swlat: 25.80,
            swlng: -101.50,
            nelat: 33.75,
            nelng: -93.50,
        }
    }
}

impl BoundingBox {
    fn validate(&self) -> Result<(), ConfigError> {
        let coords = [self.swlat, self.swlng, self.nelat, self.nelng];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ConfigError::Invalid("bounding box must be finite".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.swlat) || !(-90.0..=90.0).contains(&self.nelat) {
            return Err(ConfigError::Invalid("latitude must be within [-90, 90]".to_string()));
        }
        if !(-180.0..=180.0).contains(&self.swlng) || !(-180.0..=180.0).contains(&self.nelng) {
            return Err(ConfigError::Invalid("longitude must be within [-180, 180]".to_string()));
        }
        if self.swlat >= self.nelat || self.swlng >= self.nelng {
            return Err(ConfigError::Invalid(format!(
                "south-west corner ({}, {}) must be south-west of north-east corner ({}, {})",
                self.swlat, self.swlng, self.nelat, self.nelng
            )));
        }
        Ok(())
    }
}

/// Harvest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Observation search endpoint
    pub observation_url: String,
    /// Taxon search endpoint
    pub taxa_url: String,
    /// Cooldown held after every observation page request (seconds)
    pub api_request_interval_secs: f64,
    /// Pages fetched per species
    pub pages_to_fetch: u32,
    /// Observations per page
    pub per_page: u32,
    /// Accepted photo license codes
    pub photo_licenses: Vec<String>,
    /// Geographic filter
    pub bounding_box: BoundingBox,
    /// Species table (CSV)
    pub species_csv: PathBuf,
    /// Root directory for species image folders and the ledger
    pub raw_data_path: PathBuf,
    /// Ledger filename under `raw_data_path`
    pub ledger_filename: String,
    /// Simultaneous image downloads across all species
    pub max_concurrent_downloads: usize,
    /// Retries for transient page fetch failures
    pub max_page_retries: u32,
    /// First retry backoff (milliseconds)
    pub initial_backoff_ms: u64,
    /// Backoff cap (milliseconds)
    pub max_backoff_ms: u64,
    /// TCP connect timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Whole-request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Pause between taxon lookups (seconds)
    pub taxon_lookup_interval_secs: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            observation_url: "https://api.inaturalist.org/v1/observations".to_string(),
            taxa_url: "https://api.inaturalist.org/v1/taxa".to_string(),
            api_request_interval_secs: DEFAULT_API_REQUEST_INTERVAL_SECS,
            pages_to_fetch: DEFAULT_PAGES_TO_FETCH,
            per_page: DEFAULT_PER_PAGE,
            photo_licenses: vec!["cc0".to_string(), "cc-by".to_string(), "cc-by-nc".to_string()],
            bounding_box: BoundingBox::default(),
            species_csv: PathBuf::from("config/species.csv"),
            raw_data_path: PathBuf::from("data/raw"),
            ledger_filename: "attribution_credit.csv".to_string(),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            max_page_retries: MAX_PAGE_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            taxon_lookup_interval_secs: 1.0,
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&data)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pages_to_fetch == 0 {
            return Err(ConfigError::Invalid("pages_to_fetch must be at least 1".to_string()));
        }
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be at least 1".to_string()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.photo_licenses.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid("photo_licenses must not be empty".to_string()));
        }
        for (name, value) in [
            ("api_request_interval_secs", self.api_request_interval_secs),
            ("taxon_lookup_interval_secs", self.taxon_lookup_interval_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.ledger_filename.trim().is_empty() {
            return Err(ConfigError::Invalid("ledger_filename must not be empty".to_string()));
        }
        self.bounding_box.validate()
    }

    /// Cooldown held inside the rate limiter permit
    pub fn api_request_interval(&self) -> Duration {
        Duration::from_secs_f64(self.api_request_interval_secs)
    }

    /// Pause between taxon lookups
    pub fn taxon_lookup_interval(&self) -> Duration {
        Duration::from_secs_f64(self.taxon_lookup_interval_secs)
    }

    /// Comma-separated license filter for the query string
    pub fn license_filter(&self) -> String {
        self.photo_licenses
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Full path of the attribution ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.raw_data_path.join(&self.ledger_filename)
    }
}
