//! Log lines emitted during downloads and harvest runs

use crate::common::fixtures::*;
use crate::common::mock_server::{MockResponse, MockServer};
use species_harvester::config::HarvestConfig;
use species_harvester::downloader::{DownloadTask, Harvester, ImageDownloader};
use species_harvester::SpeciesEntry;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Collects formatted log output for the current thread's subscriber
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn capture_logs(filter: &str) -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

fn capture_json_logs(filter: &str) -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(move || writer.clone())
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

fn missing_photo_task(server: &MockServer, temp_dir: &TempDir) -> DownloadTask {
    server.route("/photos/gone/medium.jpg", vec![MockResponse::bytes(404, "not found")]);
    DownloadTask {
        source_url: server.url("/photos/gone/medium.jpg"),
        destination: temp_dir.path().join("gone.jpg"),
    }
}

#[tokio::test]
async fn test_rejected_download_warns_with_url() {
    let (logs, _guard) = capture_logs("species_harvester=info");
    let server = MockServer::start();
    let temp_dir = TempDir::new().unwrap();
    let task = missing_photo_task(&server, &temp_dir);

    ImageDownloader::new(reqwest::Client::new()).download(&task).await;

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains(&format!("Failed to download {}: status 404", task.source_url)))
        .unwrap_or_else(|| panic!("no rejection line in:\n{output}"));
    assert!(line.contains("WARN"));
    assert!(!task.destination.exists());
}

#[tokio::test]
async fn test_saved_download_logs_only_at_debug() {
    let server = MockServer::start();
    serve_photo(&server, "kept", b"jpeg");
    let temp_dir = TempDir::new().unwrap();
    let task = DownloadTask {
        source_url: server.url("/photos/kept/medium.jpg"),
        destination: temp_dir.path().join("kept.jpg"),
    };
    let downloader = ImageDownloader::new(reqwest::Client::new());

    {
        let (logs, _guard) = capture_logs("species_harvester=info");
        downloader.download(&task).await;
        assert_eq!(logs.contents(), "");
    }

    let (logs, _guard) = capture_logs("species_harvester=debug");
    downloader.download(&task).await;
    let output = logs.contents();
    assert!(output.contains("DEBUG"));
    assert!(output.contains(&format!("Downloaded {} (4 bytes)", task.source_url)));
}

#[tokio::test]
async fn test_json_lines_carry_level_and_target() {
    let (logs, _guard) = capture_json_logs("species_harvester=info");
    let server = MockServer::start();
    let temp_dir = TempDir::new().unwrap();
    let task = missing_photo_task(&server, &temp_dir);

    ImageDownloader::new(reqwest::Client::new()).download(&task).await;

    let output = logs.contents();
    let entry: serde_json::Value = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .find(|entry: &serde_json::Value| entry["level"] == "WARN")
        .unwrap_or_else(|| panic!("no warn entry in:\n{output}"));
    assert_eq!(entry["target"], "species_harvester::downloader::image");
    let message = entry["fields"]["message"].as_str().unwrap();
    assert!(message.contains(&task.source_url));
    assert!(message.contains("status 404"));
}

#[tokio::test]
async fn test_harvest_reports_skipped_page_queue_and_ledger() {
    let (logs, _guard) = capture_logs("species_harvester=info");
    let server = MockServer::start();
    server.route_query(OBSERVATIONS_PATH, &page_param(1), vec![MockResponse::json(404, "{}")]);
    server.route_query(
        OBSERVATIONS_PATH,
        &page_param(2),
        vec![page(vec![observation(7, "Blue Jay", vec![photo(&server, "jay")])])],
    );
    serve_photo(&server, "jay", b"jay");

    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfig {
        pages_to_fetch: 2,
        ..test_config(&server, temp_dir.path())
    };
    let report = Harvester::new(config)
        .unwrap()
        .run(&[SpeciesEntry::new("Blue Jay", 8229)])
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("Harvesting 1 species, 2 page(s) each"));
    assert!(output
        .lines()
        .any(|line| line.contains("WARN") && line.contains("Blue Jay: skipping page 1")));
    assert!(output.contains("Blue Jay: Total images queued for download: 1"));
    assert!(output.contains(&format!("Licensing metadata saved to {}", report.ledger_path.display())));
}
