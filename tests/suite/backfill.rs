//! End-to-end backfill: SQLite cache, HTTP discover client and paged loader.

use std::time::Duration;

use chrono::NaiveDate;
use reel_paging::LoaderConfig;
use reel_store::LocalStore;
use reel_types::{LoadError, Movie, MovieId, NetworkErrorKind, ResultState};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    DISCOVER_PATH, discover_body, loaded, loader, mount_empty_fallback, movies_json, next_matching,
    next_state, open_store,
};

#[tokio::test]
async fn empty_cache_backfills_two_week_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .and(query_param("primary_release_date.gte", "2024-05-06"))
        .and(query_param("primary_release_date.lte", "2024-05-20"))
        .and(query_param("sort_by", "primary_release_date.desc"))
        .and(query_param("page", "1"))
        .and(query_param("api_key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(discover_body(1, 1, movies_json(100, 5)))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let loader = loader(store.clone(), &server, LoaderConfig::default());
    let mut stream = loader.load();

    let first = next_state(&mut stream).await;
    assert!(first.is_loading(), "expected Loading, got {first:?}");
    assert_eq!(loaded(&first), 0);

    let ready = next_matching(&mut stream, ResultState::is_success).await;
    assert_eq!(loaded(&ready), 5);
    let list = ready.value().unwrap();
    assert_eq!(list.pages().len(), 1);
    assert_eq!(list.first().unwrap().release_date().to_string(), "2024-05-19");
    assert_eq!(store.count().unwrap(), 5);
}

#[tokio::test]
async fn end_of_cache_requests_next_remote_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_body(
            1,
            2,
            movies_json(1, 3),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_body(
            2,
            2,
            movies_json(50, 2),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_empty_fallback(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let loader = loader(store.clone(), &server, LoaderConfig::default());
    let mut stream = loader.load();

    let first_page = next_matching(&mut stream, |s| loaded(s) == 3).await;
    assert!(first_page.is_success());

    stream.load_around(2);
    let grown = next_matching(&mut stream, |s| loaded(s) == 5).await;
    assert!(grown.is_success());
    assert_eq!(grown.value().unwrap().total_count(), 5);
}

#[tokio::test]
async fn remote_failure_surfaces_error_with_cached_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    store.upsert(&cached_pair()).unwrap();

    let loader = loader(store.clone(), &server, LoaderConfig::default());
    let mut stream = loader.load();
    let ready = next_state(&mut stream).await;
    assert_eq!(loaded(&ready), 2);

    stream.load_around(1);
    let failed = next_matching(&mut stream, ResultState::is_error).await;
    match failed {
        ResultState::Error(LoadError::Network(cause), Some(list)) => {
            assert_eq!(cause.kind(), NetworkErrorKind::Status(500));
            assert_eq!(list.len(), 2);
        }
        other => panic!("expected network error with cached data, got {other:?}"),
    }
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn separate_loads_share_one_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(discover_body(1, 1, movies_json(10, 4))),
        )
        .expect(1..=2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let loader = loader(store.clone(), &server, LoaderConfig::default());
    let mut one = loader.load();
    let mut two = loader.load();

    let a = next_matching(&mut one, ResultState::is_success).await;
    let b = next_matching(&mut two, ResultState::is_success).await;
    assert_eq!(loaded(&a), 4);
    assert_eq!(loaded(&b), 4);
    assert_eq!(store.count().unwrap(), 4);
}

fn cached_pair() -> Vec<Movie> {
    vec![
        Movie::new(
            MovieId::new(1),
            "Cached One",
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        ),
        Movie::new(
            MovieId::new(2),
            "Cached Two",
            NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
        ),
    ]
}
