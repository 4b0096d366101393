//! End-to-end harvest runs against a local mock API

use crate::common::fixtures::*;
use crate::common::mock_server::{MockResponse, MockServer};
use species_harvester::downloader::Harvester;
use species_harvester::output::LEDGER_COLUMNS;
use species_harvester::SpeciesEntry;
use tempfile::TempDir;

#[tokio::test]
async fn test_single_species_downloads_every_photo_and_writes_ledger() {
    let server = MockServer::start();
    server.route(
        OBSERVATIONS_PATH,
        vec![page(vec![
            observation(101, "Northern Cardinal", vec![photo(&server, "a")]),
            observation(102, "Northern Cardinal", vec![photo(&server, "b"), photo(&server, "c")]),
        ])],
    );
    serve_photo(&server, "a", b"image-a");
    serve_photo(&server, "b", b"image-b");
    serve_photo(&server, "c", b"image-c");

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester
        .run(&[SpeciesEntry::new("Northern Cardinal", 9999)])
        .await
        .unwrap();

    let dir = species_dir(temp_dir.path(), "northern_cardinal");
    assert_eq!(
        files_in(&dir),
        vec!["northern_cardinal_1.jpg", "northern_cardinal_2.jpg", "northern_cardinal_3.jpg"]
    );
    assert_eq!(std::fs::read(dir.join("northern_cardinal_1.jpg")).unwrap(), b"image-a");
    assert_eq!(std::fs::read(dir.join("northern_cardinal_3.jpg")).unwrap(), b"image-c");

    assert_eq!(report.total_records, 3);
    assert_eq!(report.species[0].downloads.saved, 3);
    assert!(report.failures.is_empty());

    assert_eq!(ledger_headers(&report.ledger_path), LEDGER_COLUMNS);
    let rows = read_ledger(&report.ledger_path);
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "101");
    assert_eq!(&rows[0][1], "Northern Cardinal");
    assert_eq!(&rows[1][0], "102");
    assert_eq!(&rows[2][2], server.url("/photos/c/square.jpg"));
    assert_eq!(&rows[2][3], server.url("/photos/c/medium.jpg"));
    assert_eq!(&rows[2][4], "cc-by");
    assert_eq!(&rows[2][5], "northern_cardinal_3.jpg");
}

#[tokio::test]
async fn test_observation_query_carries_filters() {
    let server = MockServer::start();
    server.route(OBSERVATIONS_PATH, vec![page(vec![])]);

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    harvester.run(&[SpeciesEntry::new("Blue Jay", 9999)]).await.unwrap();

    let requests = server.requests_to(OBSERVATIONS_PATH);
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.param("taxon_id").as_deref(), Some("9999"));
    assert_eq!(request.param("photos").as_deref(), Some("true"));
    assert_eq!(request.param("per_page").as_deref(), Some("200"));
    assert_eq!(request.param("page").as_deref(), Some("1"));
    assert_eq!(request.param("photo_license").as_deref(), Some("cc0,cc-by,cc-by-nc"));
    assert_eq!(request.param("swlat").as_deref(), Some("25.8"));
    assert_eq!(request.param("swlng").as_deref(), Some("-101.5"));
    assert_eq!(request.param("nelat").as_deref(), Some("33.75"));
    assert_eq!(request.param("nelng").as_deref(), Some("-93.5"));
}

#[tokio::test]
async fn test_zero_observations_creates_directory_only() {
    let server = MockServer::start();
    server.route(OBSERVATIONS_PATH, vec![page(vec![])]);

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester.run(&[SpeciesEntry::new("Blue Jay", 8229)]).await.unwrap();

    let dir = species_dir(temp_dir.path(), "blue_jay");
    assert!(dir.is_dir());
    assert!(files_in(&dir).is_empty());
    assert_eq!(report.species[0].photos, 0);
    assert_eq!(report.species[0].pages_failed, 0);
    assert!(read_ledger(&report.ledger_path).is_empty());
    assert_eq!(ledger_headers(&report.ledger_path), LEDGER_COLUMNS);
}

#[tokio::test]
async fn test_missing_results_key_contributes_nothing() {
    let server = MockServer::start();
    server.route(
        OBSERVATIONS_PATH,
        vec![MockResponse::json(200, r#"{"total_results": 0, "page": 1}"#)],
    );

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester.run(&[SpeciesEntry::new("Blue Jay", 8229)]).await.unwrap();

    assert_eq!(report.total_records, 0);
    assert_eq!(report.species[0].pages_failed, 0);
    assert!(species_dir(temp_dir.path(), "blue_jay").is_dir());
}

#[tokio::test]
async fn test_failed_photo_does_not_stop_the_others() {
    let server = MockServer::start();
    server.route(
        OBSERVATIONS_PATH,
        vec![page(vec![observation(
            7,
            "Carolina Wren",
            vec![photo(&server, "x"), photo(&server, "gone"), photo(&server, "z")],
        )])],
    );
    serve_photo(&server, "x", b"x");
    server.route("/photos/gone/medium.jpg", vec![MockResponse::bytes(404, Vec::new())]);
    serve_photo(&server, "z", b"z");

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester
        .run(&[SpeciesEntry::new("Carolina Wren", 7513)])
        .await
        .unwrap();

    let dir = species_dir(temp_dir.path(), "carolina_wren");
    assert_eq!(files_in(&dir), vec!["carolina_wren_1.jpg", "carolina_wren_3.jpg"]);

    let downloads = &report.species[0].downloads;
    assert_eq!(downloads.saved, 2);
    assert_eq!(downloads.rejected, 1);
    assert_eq!(downloads.failed, 0);

    // The ledger lists every photo found, downloaded or not
    let rows = read_ledger(&report.ledger_path);
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[1][5], "carolina_wren_2.jpg");
}

#[tokio::test]
async fn test_rerun_produces_identical_output() {
    let server = MockServer::start();
    server.route(
        OBSERVATIONS_PATH,
        vec![page(vec![
            observation(1, "Blue Jay", vec![photo(&server, "p1"), photo(&server, "p2")]),
            observation(2, "Blue Jay", vec![photo(&server, "p3")]),
        ])],
    );
    for key in ["p1", "p2", "p3"] {
        serve_photo(&server, key, key.as_bytes());
    }

    let temp_dir = TempDir::new().unwrap();
    let species = [SpeciesEntry::new("Blue Jay", 8229)];

    let first = Harvester::new(test_config(&server, temp_dir.path()))
        .unwrap()
        .run(&species)
        .await
        .unwrap();
    let first_ledger = std::fs::read_to_string(&first.ledger_path).unwrap();
    let first_files = files_in(&species_dir(temp_dir.path(), "blue_jay"));

    let second = Harvester::new(test_config(&server, temp_dir.path()))
        .unwrap()
        .run(&species)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&second.ledger_path).unwrap(), first_ledger);
    assert_eq!(files_in(&species_dir(temp_dir.path(), "blue_jay")), first_files);
    assert_eq!(
        std::fs::read(species_dir(temp_dir.path(), "blue_jay").join("blue_jay_2.jpg")).unwrap(),
        b"p2"
    );
}

#[tokio::test]
async fn test_multiple_species_keep_their_records_together() {
    let server = MockServer::start();
    server.route_query(
        OBSERVATIONS_PATH,
        "taxon_id=1&",
        vec![page(vec![observation(
            11,
            "Blue Jay",
            vec![photo(&server, "j1"), photo(&server, "j2")],
        )])],
    );
    server.route_query(
        OBSERVATIONS_PATH,
        "taxon_id=2&",
        vec![page(vec![
            observation(21, "Carolina Wren", vec![photo(&server, "w1")]),
            observation(22, "Carolina Wren", vec![photo(&server, "w2")]),
        ])],
    );
    for key in ["j1", "j2", "w1", "w2"] {
        serve_photo(&server, key, key.as_bytes());
    }

    let temp_dir = TempDir::new().unwrap();
    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester
        .run(&[SpeciesEntry::new("Blue Jay", 1), SpeciesEntry::new("Carolina Wren", 2)])
        .await
        .unwrap();

    assert_eq!(report.species.len(), 2);
    assert_eq!(report.total_records, 4);

    let files: Vec<String> = read_ledger(&report.ledger_path)
        .iter()
        .map(|row| row[5].to_string())
        .collect();
    let jay: Vec<&str> = files.iter().map(String::as_str).filter(|f| f.starts_with("blue_jay")).collect();
    let wren: Vec<&str> = files.iter().map(String::as_str).filter(|f| f.starts_with("carolina_wren")).collect();
    assert_eq!(jay, vec!["blue_jay_1.jpg", "blue_jay_2.jpg"]);
    assert_eq!(wren, vec!["carolina_wren_1.jpg", "carolina_wren_2.jpg"]);

    // Each species' rows are contiguous
    let first_wren = files.iter().position(|f| f.starts_with("carolina_wren")).unwrap();
    assert!(files[first_wren..first_wren + 2].iter().all(|f| f.starts_with("carolina_wren")));

    assert_eq!(files_in(&species_dir(temp_dir.path(), "blue_jay")).len(), 2);
    assert_eq!(files_in(&species_dir(temp_dir.path(), "carolina_wren")).len(), 2);
}

#[tokio::test]
async fn test_failed_page_is_skipped_and_numbering_continues() {
    let server = MockServer::start();
    server.route_query(
        OBSERVATIONS_PATH,
        &page_param(1),
        vec![MockResponse::json(404, r#"{"error":"gone"}"#)],
    );
    server.route_query(
        OBSERVATIONS_PATH,
        &page_param(2),
        vec![page(vec![observation(5, "Blue Jay", vec![photo(&server, "q")])])],
    );
    serve_photo(&server, "q", b"q");

    let temp_dir = TempDir::new().unwrap();
    let config = species_harvester::config::HarvestConfig {
        pages_to_fetch: 2,
        ..test_config(&server, temp_dir.path())
    };
    let report = Harvester::new(config)
        .unwrap()
        .run(&[SpeciesEntry::new("Blue Jay", 8229)])
        .await
        .unwrap();

    assert_eq!(report.species[0].pages_failed, 1);
    assert_eq!(report.species[0].photos, 1);
    assert_eq!(files_in(&species_dir(temp_dir.path(), "blue_jay")), vec!["blue_jay_1.jpg"]);
}

#[tokio::test]
async fn test_species_failure_does_not_abort_run() {
    let server = MockServer::start();
    server.route(OBSERVATIONS_PATH, vec![page(vec![])]);

    let temp_dir = TempDir::new().unwrap();
    // A regular file where the species directory should go
    std::fs::write(temp_dir.path().join("blocked"), b"").unwrap();

    let harvester = Harvester::new(test_config(&server, temp_dir.path())).unwrap();
    let report = harvester
        .run(&[SpeciesEntry::new("Blocked", 1), SpeciesEntry::new("Blue Jay", 2)])
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "Blocked");
    assert_eq!(report.species.len(), 1);
    assert_eq!(report.species[0].name, "Blue Jay");
    assert!(report.ledger_path.exists());
}
