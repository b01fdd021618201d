//! Reel configuration.
//!
//! Read from `~/.reel/config.toml`. Every section and key is optional; a
//! missing file means defaults throughout. String values may reference
//! environment variables as `${VAR}`.
//!
//! ```toml
//! [api]
//! base_url = "https://api.themoviedb.org/3"
//! api_key = "${TMDB_API_KEY}"
//!
//! [paging]
//! page_size = 20
//! classify = "fetch_aware"
//!
//! [store]
//! path = "~/.reel/movies.db"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use reel_paging::{ClassifyPolicy, DEFAULT_PREFETCH_DISTANCE, LoaderConfig};
use reel_remote::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, DiscoverConfig, RetryConfig,
};
use reel_types::{DEFAULT_LOOK_BACK_DAYS, DEFAULT_PAGE_SIZE};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

const APP_DIR: &str = ".reel";
const CONFIG_FILE: &str = "config.toml";
const STORE_FILE: &str = "movies.db";

#[derive(Debug, Default, Deserialize)]
pub struct ReelConfig {
    pub api: Option<ApiConfig>,
    pub paging: Option<PagingConfig>,
    pub store: Option<StoreConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

// Manual Debug impl to prevent leaking the API key in logs.
impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PagingConfig {
    /// Items per page. Default: 20. Minimum: 1.
    pub page_size: Option<usize>,
    /// Items ahead of the cursor kept loaded. Default: 5.
    pub prefetch_distance: Option<usize>,
    /// Days covered by each remote fetch window. Default: 14. Minimum: 1.
    pub look_back_days: Option<i64>,
    /// Fire the front boundary too. Default: false.
    #[serde(default)]
    pub bidirectional: bool,
    pub classify: Option<ClassifyPolicy>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreConfig {
    pub path: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub discover: DiscoverConfig,
    pub loader: LoaderConfig,
    pub store_path: PathBuf,
}

/// Replace every `${VAR}` with the variable's value (empty when unset).
/// An unterminated `${` is kept literally.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find("${") {
        let (before, tail) = rest.split_at(pos);
        out.push_str(before);
        let Some(end) = tail[2..].find('}') else {
            out.push_str(tail);
            return out;
        };
        let var = &tail[2..2 + end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &tail[2 + end + 1..];
    }

    out.push_str(rest);
    out
}

impl ReelConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Apply defaults and validate.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        Ok(Settings {
            discover: self.discover_config()?,
            loader: self.loader_config()?,
            store_path: self.store_path(),
        })
    }

    fn discover_config(&self) -> Result<DiscoverConfig, ConfigError> {
        let api = self.api.as_ref();

        let base_url = api
            .and_then(|a| a.base_url.as_deref())
            .map(expand_env_vars)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url", "must not be empty"));
        }

        let api_key = api
            .and_then(|a| a.api_key.as_deref())
            .map(expand_env_vars);

        let connect_secs = api
            .and_then(|a| a.connect_timeout_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        if connect_secs == 0 {
            return Err(ConfigError::invalid("api.connect_timeout_secs", "must be at least 1"));
        }
        let read_secs = api
            .and_then(|a| a.read_timeout_secs)
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS);
        if read_secs == 0 {
            return Err(ConfigError::invalid("api.read_timeout_secs", "must be at least 1"));
        }

        let mut retry = RetryConfig::default();
        if let Some(max_retries) = api.and_then(|a| a.max_retries) {
            retry = retry.with_max_retries(max_retries);
        }

        let mut config = DiscoverConfig::new(base_url)
            .with_api_key(api_key)
            .with_retry(retry);
        config.connect_timeout = Duration::from_secs(connect_secs);
        config.request_timeout = Duration::from_secs(read_secs);
        Ok(config)
    }

    fn loader_config(&self) -> Result<LoaderConfig, ConfigError> {
        let paging = self.paging.as_ref();

        let page_size = paging
            .and_then(|p| p.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::invalid("paging.page_size", "must be at least 1"));
        }

        let look_back_days = paging
            .and_then(|p| p.look_back_days)
            .unwrap_or(DEFAULT_LOOK_BACK_DAYS);
        if look_back_days < 1 {
            return Err(ConfigError::invalid(
                "paging.look_back_days",
                format!("must be at least 1, got {look_back_days}"),
            ));
        }
        let look_back = chrono::Duration::try_days(look_back_days).ok_or_else(|| {
            ConfigError::invalid("paging.look_back_days", format!("{look_back_days} is out of range"))
        })?;

        Ok(LoaderConfig {
            page_size,
            prefetch_distance: paging
                .and_then(|p| p.prefetch_distance)
                .unwrap_or(DEFAULT_PREFETCH_DISTANCE),
            look_back,
            bidirectional: paging.is_some_and(|p| p.bidirectional),
            classify: paging.and_then(|p| p.classify).unwrap_or_default(),
        })
    }

    fn store_path(&self) -> PathBuf {
        self.store
            .as_ref()
            .and_then(|s| s.path.as_deref())
            .map(|raw| expand_home(&expand_env_vars(raw)))
            .unwrap_or_else(default_store_path)
    }
}

/// `~/.reel`, when a home directory is known.
#[must_use]
pub fn reel_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    reel_home().map(|dir| dir.join(CONFIG_FILE))
}

/// `~/.reel/movies.db`, or `./.reel/movies.db` without a home directory.
#[must_use]
pub fn default_store_path() -> PathBuf {
    reel_home()
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
        .join(STORE_FILE)
}

fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}
