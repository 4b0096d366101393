//! Renumber the images in a species folder
//!
//! Files are renamed to `{folder_name}_{index}{ext}` with a lowercase
//! extension and indices starting at 1. Order follows the number formed by
//! the digits in each original name; files without digits go last, by name.
//! Renaming goes through temporary names first so no existing file is
//! overwritten midway.

use super::{OutputError, OutputResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TEMP_PREFIX: &str = ".renumber-";

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name == "DS_Store"
}

// Digit runs are concatenated, as in "img_2_of_10" -> 210.
fn numeric_key(name: &str) -> Option<u128> {
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse().ok().or(Some(u128::MAX))
}

fn lowercase_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

// Leftovers from an interrupted run keep their names; the counter skips past them.
fn free_temp_path(folder: &Path, next: &mut usize) -> PathBuf {
    loop {
        let candidate = folder.join(format!("{TEMP_PREFIX}{}", *next));
        *next += 1;
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// Renumber every regular file in `folder`; returns the number of files
pub fn normalize_filenames<P: AsRef<Path>>(folder: P) -> OutputResult<usize> {
    let folder = folder.as_ref();
    let folder_name = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| OutputError::IoError(format!("{} has no folder name", folder.display())))?;

    let entries = std::fs::read_dir(folder)
        .map_err(|e| OutputError::IoError(format!("Failed to read {}: {}", folder.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OutputError::IoError(e.to_string()))?;
        let is_file = entry
            .file_type()
            .map_err(|e| OutputError::IoError(e.to_string()))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && !is_ignored(&name) {
            files.push(name);
        }
    }

    files.sort_by(|a, b| match (numeric_key(a), numeric_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });

    let plan: Vec<(String, String)> = files
        .iter()
        .enumerate()
        .map(|(idx, old)| (old.clone(), format!("{}_{}{}", folder_name, idx + 1, lowercase_extension(old))))
        .filter(|(old, new)| old != new)
        .collect();

    let mut temps = Vec::with_capacity(plan.len());
    let mut next_temp = 0;
    for (old, _) in &plan {
        let temp = free_temp_path(folder, &mut next_temp);
        std::fs::rename(folder.join(old), &temp)
            .map_err(|e| OutputError::IoError(format!("Failed to rename {}: {}", old, e)))?;
        temps.push(temp);
    }
    for ((old, new), temp) in plan.iter().zip(&temps) {
        std::fs::rename(temp, folder.join(new))
            .map_err(|e| OutputError::IoError(format!("Failed to rename {} to {}: {}", old, new, e)))?;
        debug!("Renamed {} -> {}", old, new);
    }

    info!("Finished renaming {} with {} files", folder_name, files.len());
    Ok(files.len())
}
