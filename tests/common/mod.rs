//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use reel_paging::{LoadStream, LoaderConfig, ManualClock, PagedLoader};
use reel_remote::{DiscoverClient, DiscoverConfig, RetryConfig};
use reel_store::SqliteMovieStore;
use reel_types::{MovieListState, PagedList};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DISCOVER_PATH: &str = "/3/discover/movie";

/// Wall clock every test runs at: 2024-05-20 12:00 UTC.
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
    ))
}

pub fn movie_json(id: i64, title: &str, release_date: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "overview": format!("Overview of {title}"),
        "poster_path": format!("/{id}.jpg"),
        "release_date": release_date,
        "vote_average": 7.1,
        "popularity": 120.5
    })
}

/// `count` movies with ids starting at `first_id`, released on consecutive
/// days counting down from 2024-05-19.
pub fn movies_json(first_id: i64, count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let id = first_id + i as i64;
            let day = 19 - (i % 13);
            movie_json(id, &format!("Movie {id}"), &format!("2024-05-{day:02}"))
        })
        .collect()
}

pub fn discover_body(page: u32, total_pages: u32, results: Vec<Value>) -> Value {
    json!({
        "page": page,
        "total_pages": total_pages,
        "total_results": results.len(),
        "results": results
    })
}

/// Mount a catch-all discover response with no results at low priority.
pub async fn mount_empty_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_body(99, 1, Vec::new())))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

pub fn discover_config(server: &MockServer) -> DiscoverConfig {
    DiscoverConfig::new(format!("{}/3", server.uri()))
        .with_api_key(Some("test-key".to_string()))
        .with_retry(RetryConfig {
            max_retries: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_factor: 0.0,
        })
}

pub fn open_store(dir: &Path) -> Arc<SqliteMovieStore> {
    Arc::new(SqliteMovieStore::open(dir.join("movies.db")).expect("open store"))
}

pub fn loader(
    store: Arc<SqliteMovieStore>,
    server: &MockServer,
    config: LoaderConfig,
) -> PagedLoader {
    let remote = DiscoverClient::new(discover_config(server)).expect("discover client");
    PagedLoader::new(store, Arc::new(remote), config, Handle::current()).with_clock(clock())
}

pub fn loaded(state: &MovieListState) -> usize {
    state.value().map_or(0, PagedList::len)
}

pub async fn next_state(stream: &mut LoadStream) -> MovieListState {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("emission within deadline")
        .expect("stream still open")
}

/// Skip emissions until one satisfies `pred`.
pub async fn next_matching(
    stream: &mut LoadStream,
    pred: impl Fn(&MovieListState) -> bool,
) -> MovieListState {
    loop {
        let state = next_state(stream).await;
        if pred(&state) {
            return state;
        }
    }
}
