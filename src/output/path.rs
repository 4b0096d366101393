//! Per-species output layout
//!
//! Images live in `{raw_data_path}/{species_slug}/{species_slug}_{index}.jpg`,
//! with `index` starting at 1 and assigned in discovery order.

use super::{OutputError, OutputResult};
use crate::species::species_slug;
use std::path::{Path, PathBuf};

/// Image file extension used for every download
pub const IMAGE_EXTENSION: &str = "jpg";

/// Directory and filename layout for one species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesLayout {
    slug: String,
    dir: PathBuf,
}

impl SpeciesLayout {
    /// Layout for `species_name` under `root`
    pub fn new(root: &Path, species_name: &str) -> Self {
        let slug = species_slug(species_name);
        let dir = root.join(&slug);
        Self { slug, dir }
    }

    /// Species slug
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Species directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filename for the `index`-th image (1-based)
    pub fn image_filename(&self, index: usize) -> String {
        format!("{}_{}.{}", self.slug, index, IMAGE_EXTENSION)
    }

    /// Full path for an image filename inside the species directory
    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Create the species directory if needed (idempotent)
    pub async fn ensure_dir(&self) -> OutputResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }
}
