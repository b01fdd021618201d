//! Cache persistence and deletion through the loader.

use reel_paging::LoaderConfig;
use reel_store::{LocalStore, SqliteMovieStore};
use reel_types::{MovieId, ResultState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    DISCOVER_PATH, discover_body, loaded, loader, movies_json, next_matching, next_state,
    open_store,
};

#[tokio::test]
async fn reopened_cache_serves_without_remote_calls() {
    let dir = tempfile::tempdir().unwrap();

    {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DISCOVER_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(discover_body(1, 1, movies_json(1, 6))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = open_store(dir.path());
        let loader = loader(store, &server, LoaderConfig::default());
        let mut stream = loader.load();
        let ready = next_matching(&mut stream, ResultState::is_success).await;
        assert_eq!(loaded(&ready), 6);
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = open_store(dir.path());
    let loader = loader(store, &server, LoaderConfig::default());
    let mut stream = loader.load();
    let cached = next_state(&mut stream).await;
    assert!(cached.is_success(), "expected cached Success, got {cached:?}");
    assert_eq!(loaded(&cached), 6);
}

#[tokio::test]
async fn delete_through_loader_updates_subscribers() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    // Seed through the remote so the full decode path is exercised.
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(discover_body(1, 1, movies_json(1, 3))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let loader = loader(store.clone(), &server, LoaderConfig::default());
    let mut stream = loader.load();
    let ready = next_matching(&mut stream, |s| loaded(s) == 3).await;
    let victim = ready.value().unwrap().get(1).unwrap().clone();

    assert_eq!(loader.delete(&victim).await.unwrap(), 1);
    let after = next_state(&mut stream).await;
    assert_eq!(loaded(&after), 2);
    assert!(after.value().unwrap().iter().all(|m| m.id() != victim.id()));

    assert_eq!(loader.delete(&victim).await.unwrap(), 0);
    assert_eq!(loader.delete_by_id(MovieId::new(999)).await.unwrap(), 0);
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn remote_fields_round_trip_through_sqlite() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVER_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(discover_body(1, 1, movies_json(77, 1))),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(dir.path());
    let loader = loader(store, &server, LoaderConfig::default());
    let mut stream = loader.load();
    next_matching(&mut stream, ResultState::is_success).await;
    drop(stream);

    let reopened = SqliteMovieStore::open(dir.path().join("movies.db")).unwrap();
    let movie = reopened.get(MovieId::new(77)).unwrap().expect("cached");
    assert_eq!(movie.title(), "Movie 77");
    assert_eq!(movie.overview(), "Overview of Movie 77");
    assert_eq!(movie.poster_path(), Some("/77.jpg"));
    assert!((movie.vote_average() - 7.1).abs() < f64::EPSILON);
    assert!((movie.popularity() - 120.5).abs() < f64::EPSILON);
}
