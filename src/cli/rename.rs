//! Rename command: renumber image files inside species folders

use crate::config::HarvestConfig;
use crate::output::normalize_filenames;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use super::OutputFormat;

/// Rename command arguments
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Folders to renumber (defaults to every species folder under the output root)
    pub folders: Vec<PathBuf>,
}

impl RenameArgs {
    /// Renumber each folder to `{folder}_1.ext`, `{folder}_2.ext`, ... in numeric filename order
    pub fn execute(&self, config: &HarvestConfig, format: OutputFormat) -> Result<usize> {
        let folders = if self.folders.is_empty() {
            species_folders(config)?
        } else {
            self.folders.clone()
        };

        let mut total = 0;
        let mut renamed = Vec::with_capacity(folders.len());
        for folder in &folders {
            let count = normalize_filenames(folder)
                .with_context(|| format!("Failed to renumber {}", folder.display()))?;
            info!("Renumbered {} files in {}", count, folder.display());
            renamed.push(json!({ "folder": folder.display().to_string(), "files": count }));
            total += count;
        }

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&renamed)?),
            OutputFormat::Human => {
                println!("Renumbered {} files in {} folder(s)", total, folders.len());
            }
        }

        Ok(total)
    }
}

fn species_folders(config: &HarvestConfig) -> Result<Vec<PathBuf>> {
    let root = &config.raw_data_path;
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read output directory {}", root.display()))?;

    let mut folders = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}
