//! `/discover/movie` client.
//!
//! Request shape:
//!
//! ```text
//! GET {base}/discover/movie
//!     ?primary_release_date.gte=2024-05-06
//!     &primary_release_date.lte=2024-05-20
//!     &sort_by=primary_release_date.desc
//!     &page=1
//!     &api_key=...            (when configured)
//! ```

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reel_types::{BoundaryWindow, Movie, MovieId, NetworkError, SERVER_DATE_FORMAT};
use serde::Deserialize;
use url::Url;

use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};
use crate::{
    ClientBuildError, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, FetchFut,
    RemoteSource, classify_reqwest_error, http_client,
};

const DISCOVER_PATH: &str = "discover/movie";
const MAX_ERROR_BODY_BYTES: usize = 2 * 1024;

/// Connection settings for [`DiscoverClient`].
#[derive(Clone)]
pub struct DiscoverConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl DiscoverConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

// Manual Debug impl to prevent leaking the API key in logs.
impl fmt::Debug for DiscoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoverConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    results: Vec<MovieDto>,
}

#[derive(Debug, Deserialize)]
struct MovieDto {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    popularity: f64,
}

impl MovieDto {
    /// Entries without a usable release date cannot be ordered and are dropped.
    fn into_movie(self) -> Option<Movie> {
        let raw = self.release_date.as_deref().unwrap_or_default();
        let Ok(release_date) = NaiveDate::parse_from_str(raw, SERVER_DATE_FORMAT) else {
            tracing::debug!(id = self.id, release_date = raw, "Skipping movie without release date");
            return None;
        };
        Some(
            Movie::new(MovieId::new(self.id), self.title, release_date)
                .with_overview(self.overview)
                .with_poster_path(self.poster_path)
                .with_vote_average(self.vote_average)
                .with_popularity(self.popularity),
        )
    }
}

/// HTTP [`RemoteSource`] for a TMDB-compatible discover endpoint.
pub struct DiscoverClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl DiscoverClient {
    /// Build a client that owns its own connection pool.
    pub fn new(config: DiscoverConfig) -> Result<Self, ClientBuildError> {
        let client = http_client(config.connect_timeout, config.request_timeout)?;
        Self::with_client(client, config)
    }

    /// Build on top of an existing `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        config: DiscoverConfig,
    ) -> Result<Self, ClientBuildError> {
        let endpoint = discover_endpoint(&config.base_url)?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, window: BoundaryWindow, page: u32) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("primary_release_date.gte", &window.start_param())
                .append_pair("primary_release_date.lte", &window.end_param())
                .append_pair("sort_by", "primary_release_date.desc")
                .append_pair("page", &page.max(1).to_string());
            if let Some(key) = &self.api_key {
                query.append_pair("api_key", key);
            }
        }
        url
    }

    async fn fetch(&self, window: BoundaryWindow, page: u32) -> Result<Vec<Movie>, NetworkError> {
        let url = self.request_url(window, page);
        let outcome = send_with_retry(|| self.client.get(url.clone()), &self.retry).await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let body = truncate_body(&body);
                return Err(NetworkError::status(status, body));
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                let err = classify_reqwest_error(&source);
                return Err(NetworkError::new(
                    err.kind(),
                    format!("after {attempts} attempts: {}", err.message()),
                ));
            }
            RetryOutcome::NonRetryable(source) => return Err(classify_reqwest_error(&source)),
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let parsed: DiscoverResponse = serde_json::from_slice(&bytes)
            .map_err(|e| NetworkError::decode(format!("discover response: {e}")))?;

        let received = parsed.results.len();
        let movies: Vec<Movie> = parsed
            .results
            .into_iter()
            .filter_map(MovieDto::into_movie)
            .collect();
        tracing::debug!(
            window = %window,
            page = parsed.page,
            total_pages = parsed.total_pages,
            received,
            kept = movies.len(),
            "Fetched discover page"
        );
        Ok(movies)
    }
}

impl RemoteSource for DiscoverClient {
    fn fetch_window(&self, window: BoundaryWindow, page: u32) -> FetchFut<'_> {
        Box::pin(self.fetch(window, page))
    }
}

fn discover_endpoint(base_url: &str) -> Result<Url, ClientBuildError> {
    let trimmed = base_url.trim();
    // Url::join replaces the last segment unless the base ends with '/'.
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let base = Url::parse(&normalized).map_err(|source| ClientBuildError::InvalidBaseUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if base.cannot_be_a_base() {
        return Err(ClientBuildError::OpaqueBaseUrl(trimmed.to_string()));
    }
    base.join(DISCOVER_PATH)
        .map_err(|source| ClientBuildError::InvalidBaseUrl {
            url: trimmed.to_string(),
            source,
        })
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.trim().to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", body[..end].trim_end())
}
