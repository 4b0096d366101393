//! Observation requests are spaced by the shared cooldown

use crate::common::fixtures::*;
use crate::common::mock_server::MockServer;
use futures::future::join_all;
use species_harvester::config::HarvestConfig;
use species_harvester::downloader::{Harvester, RateLimiter};
use species_harvester::fetcher::{build_http_client, ObservationClient, PageQuery};
use species_harvester::SpeciesEntry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Arrival gaps between consecutive observation requests
fn arrival_gaps(server: &MockServer) -> Vec<Duration> {
    let mut arrivals: Vec<Instant> = server
        .requests_to(OBSERVATIONS_PATH)
        .iter()
        .map(|r| r.at)
        .collect();
    arrivals.sort();
    arrivals.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test]
async fn test_concurrent_page_fetches_are_serialized() {
    let server = MockServer::start();
    server.route(OBSERVATIONS_PATH, vec![page(vec![])]);

    let cooldown = Duration::from_millis(150);
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&server, temp_dir.path());
    let client = ObservationClient::new(
        build_http_client(&config).unwrap(),
        server.url(OBSERVATIONS_PATH),
        Arc::new(RateLimiter::new(cooldown)),
    );
    let queries = PageQuery::pages(&config, 9999, 3);

    let results = join_all(queries.iter().map(|q| client.fetch_page(q))).await;

    assert!(results.iter().all(Result::is_ok));
    let gaps = arrival_gaps(&server);
    assert_eq!(gaps.len(), 2);
    for gap in gaps {
        assert!(gap >= cooldown, "requests only {gap:?} apart");
    }
}

#[tokio::test]
async fn test_harvest_spaces_requests_across_species() {
    let server = MockServer::start();
    server.route(OBSERVATIONS_PATH, vec![page(vec![])]);

    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfig {
        api_request_interval_secs: 0.1,
        pages_to_fetch: 2,
        ..test_config(&server, temp_dir.path())
    };
    let species = [SpeciesEntry::new("Blue Jay", 1), SpeciesEntry::new("Carolina Wren", 2)];

    let started = Instant::now();
    Harvester::new(config).unwrap().run(&species).await.unwrap();
    let elapsed = started.elapsed();

    let gaps = arrival_gaps(&server);
    assert_eq!(gaps.len(), 3);
    assert!(gaps.iter().all(|gap| *gap >= Duration::from_millis(100)), "gaps: {gaps:?}");
    // Four requests, each followed by a cooldown
    assert!(elapsed >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_zero_cooldown_does_not_wait() {
    let limiter = RateLimiter::new(Duration::ZERO);
    let started = Instant::now();
    for i in 0..5 {
        assert_eq!(limiter.throttle(|| async move { i }).await.unwrap(), i);
    }
    assert!(started.elapsed() < Duration::from_millis(100));
}
