//! Configuration file to running client.

use std::time::Duration;

use reel_config::{ConfigError, ReelConfig};
use reel_paging::ClassifyPolicy;
use reel_remote::DiscoverClient;

#[test]
fn config_file_drives_client_and_loader() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let store_path = dir.path().join("cache").join("movies.db");
    std::fs::write(
        &config_path,
        format!(
            r#"
[api]
base_url = "http://127.0.0.1:9/3"
read_timeout_secs = 15
max_retries = 1

[paging]
page_size = 10
look_back_days = 30
classify = "fetch_aware"

[store]
path = "{}"
"#,
            store_path.display()
        ),
    )
    .unwrap();

    let settings = ReelConfig::load_from(&config_path)
        .unwrap()
        .expect("config present")
        .resolve()
        .unwrap();

    assert_eq!(settings.discover.request_timeout, Duration::from_secs(15));
    assert_eq!(settings.discover.retry.max_retries, 1);
    assert_eq!(settings.loader.page_size, 10);
    assert_eq!(settings.loader.look_back, chrono::Duration::days(30));
    assert_eq!(settings.loader.classify, ClassifyPolicy::FetchAware);
    assert_eq!(settings.store_path, store_path);

    let client = DiscoverClient::new(settings.discover).unwrap();
    assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:9/3/discover/movie");
}

#[test]
fn invalid_values_are_rejected_before_anything_starts() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[api]\nconnect_timeout_secs = 0\n").unwrap();

    let err = ReelConfig::load_from(&config_path)
        .unwrap()
        .unwrap()
        .resolve()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "api.connect_timeout_secs",
            ..
        }
    ));
    assert!(err.to_string().contains("connect_timeout_secs"));
}
