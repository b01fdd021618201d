//! Remote movie catalogue access.
//!
//! # Architecture
//!
//! - [`RemoteSource`] - the contract the paging core fetches through: one call
//!   returns the movies released inside a [`BoundaryWindow`], one remote page
//!   at a time
//! - [`DiscoverClient`] - HTTP implementation against a TMDB-style
//!   `/discover/movie` endpoint
//! - [`retry`] - exponential backoff for transient transport and status errors
//!
//! # Error Handling
//!
//! Every failure is folded into [`NetworkError`] with a stable
//! [`NetworkErrorKind`](reel_types::NetworkErrorKind): timeouts, transport
//! failures, non-2xx statuses and undecodable bodies. Nothing here panics on
//! remote input.

mod discover;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reel_types::{BoundaryWindow, Movie, NetworkError};

pub use discover::{DiscoverClient, DiscoverConfig};
pub use retry::RetryConfig;

/// Remote fetch future type alias.
pub type FetchFut<'a> = Pin<Box<dyn Future<Output = Result<Vec<Movie>, NetworkError>> + Send + 'a>>;

/// A remote catalogue that can list movies released inside a time window.
///
/// `page` is 1-based; a page past the end yields an empty list.
pub trait RemoteSource: Send + Sync {
    fn fetch_window(&self, window: BoundaryWindow, page: u32) -> FetchFut<'_>;
}

/// Default connect timeout, seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default whole-request timeout, seconds.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("base URL '{0}' cannot carry a path")]
    OpaqueBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build an owned HTTP client with the given timeouts.
pub fn http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<reqwest::Client, ClientBuildError> {
    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("reel/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Fold a transport-level reqwest error into the network taxonomy.
#[must_use]
pub fn classify_reqwest_error(error: &reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::timeout(error.to_string())
    } else if error.is_decode() {
        NetworkError::decode(error.to_string())
    } else if let Some(status) = error.status() {
        NetworkError::status(status.as_u16(), error.to_string())
    } else {
        NetworkError::transport(error.to_string())
    }
}
