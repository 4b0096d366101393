//! Best-effort image downloads
//!
//! A download either saves the photo or logs why it did not. It never returns
//! an error, so one stale link cannot abort its siblings or the run.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::DownloadError;

/// One photo to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Medium-resolution photo URL
    pub source_url: String,
    /// File to create or overwrite
    pub destination: PathBuf,
}

/// Result of a single download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written
    Saved {
        /// Bytes written
        bytes: u64,
    },
    /// Server answered with something other than 200
    Rejected {
        /// Status code returned
        status: u16,
    },
    /// Transport or filesystem failure
    Failed {
        /// Error description
        reason: String,
    },
}

impl DownloadOutcome {
    /// Whether the file was written
    pub fn is_saved(&self) -> bool {
        matches!(self, DownloadOutcome::Saved { .. })
    }
}

/// Download outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadTally {
    /// Files written
    pub saved: usize,
    /// Non-200 responses
    pub rejected: usize,
    /// Transport or IO failures
    pub failed: usize,
}

impl DownloadTally {
    /// Count one outcome
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Saved { .. } => self.saved += 1,
            DownloadOutcome::Rejected { .. } => self.rejected += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Downloads attempted
    pub fn attempted(&self) -> usize {
        self.saved + self.rejected + self.failed
    }
}

/// Fetches photos over the shared HTTP client
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
}

impl ImageDownloader {
    /// Create a downloader using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download one photo, streaming the body to its destination
    pub async fn download(&self, task: &DownloadTask) -> DownloadOutcome {
        let response = match self.client.get(&task.source_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Cannot download {}: {}", task.source_url, e);
                return DownloadOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Failed to download {}: status {}", task.source_url, status.as_u16());
            return DownloadOutcome::Rejected {
                status: status.as_u16(),
            };
        }

        match save_body(response, &task.destination).await {
            Ok(bytes) => {
                debug!("Downloaded {} ({} bytes) to {}", task.source_url, bytes, task.destination.display());
                DownloadOutcome::Saved { bytes }
            }
            Err(e) => {
                warn!("Cannot download {}: {}", task.source_url, e);
                DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

// Chunks go straight to disk; a photo is never held in memory whole.
async fn save_body(response: reqwest::Response, destination: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
        DownloadError::IoError(format!("Failed to create {}: {}", destination.display(), e))
    })?;

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| DownloadError::NetworkError(e.to_string()))?;
        file.write_all(&chunk).await.map_err(|e| {
            DownloadError::IoError(format!("Failed to write {}: {}", destination.display(), e))
        })?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| {
        DownloadError::IoError(format!("Failed to flush {}: {}", destination.display(), e))
    })?;
    Ok(written)
}
