use podcast_proto::config::SourceConfig;
use podcast_proto::enrich::load_catalog;
use podcast_proto::view::{genres, project};
use podcast_proto::{HttpSource, SortKey};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[ignore = "hits the public podcast API; run explicitly with --ignored --nocapture"]
async fn live_catalog_loads_and_projects() {
    let mut config = SourceConfig::default();
    if let Ok(url) = std::env::var("PODCAST_API_URL") {
        config.base_url = url;
    }
    let max_in_flight = std::env::var("PODCAST_MAX_IN_FLIGHT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8);

    let source = Arc::new(HttpSource::new(&config).expect("client should initialize"));
    let started = Instant::now();
    let shows = load_catalog(source, max_in_flight, &CancellationToken::new())
        .await
        .expect("catalog should load");

    println!(
        "loaded {} shows in {:?} (max_in_flight={})",
        shows.len(),
        started.elapsed(),
        max_in_flight
    );
    assert!(!shows.is_empty());

    let enriched = shows.iter().filter(|s| !s.seasons.is_empty()).count();
    println!("enriched: {enriched}/{}", shows.len());
    println!("genres: {:?}", genres(&shows));

    for show in project(&shows, None, SortKey::UpdatedRecent).iter().take(5) {
        println!(
            "{:>8} {:<40} seasons={} episodes={} updated={:?}",
            show.id,
            show.title,
            show.season_count(),
            show.episode_count(),
            show.updated.known()
        );
    }
}
