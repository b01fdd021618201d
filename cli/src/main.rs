//! Reel CLI - binary entry point and composition root.
//!
//! # Architecture
//!
//! `main` owns every long-lived object and passes them down explicitly:
//!
//! ```text
//! ReelConfig::load() -> Settings
//!        |
//!        +-> SqliteMovieStore (Arc<dyn LocalStore>)
//!        +-> DiscoverClient   (Arc<dyn RemoteSource>)
//!        +-> PagedLoader::new(store, remote, loader config, runtime handle)
//! ```
//!
//! Logs go to `~/.reel/logs/reel.log` so stdout stays clean for output.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use reel_config::{ReelConfig, Settings};
use reel_paging::PagedLoader;
use reel_remote::DiscoverClient;
use reel_store::{LocalStore, SqliteMovieStore};
use reel_types::{Movie, MovieId, MovieListState, ResultState};

/// Slack on top of the worst-case remote call before `browse` gives up waiting.
const IDLE_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Browse recently released movies from a local cache")]
struct Cli {
    /// Config file to use instead of ~/.reel/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print cached movies, newest first, backfilling from the remote as needed
    Browse {
        /// Number of pages to print
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Remove a cached movie
    Delete {
        /// Remote movie id
        id: i64,
    },
    /// Print the number of cached movies
    Count,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: prefer no logs over mixing them into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.reel/logs/reel.log
    if let Some(home) = reel_config::reel_home() {
        candidates.push(home.join("logs").join("reel.log"));
    }

    // Fallback: ./.reel/logs/reel.log
    candidates.push(PathBuf::from(".reel").join("logs").join("reel.log"));

    candidates
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let config = match path {
        Some(path) => ReelConfig::load_from(path)?,
        None => ReelConfig::load()?,
    };
    let settings = config.unwrap_or_default().resolve()?;
    tracing::debug!(?settings, "Configuration resolved");
    Ok(settings)
}

fn open_store(settings: &Settings) -> Result<Arc<SqliteMovieStore>> {
    let store = SqliteMovieStore::open(&settings.store_path)
        .with_context(|| format!("opening cache at {}", settings.store_path.display()))?;
    Ok(Arc::new(store))
}

fn build_loader(settings: &Settings, store: Arc<SqliteMovieStore>) -> Result<PagedLoader> {
    let remote =
        DiscoverClient::new(settings.discover.clone()).context("building discover client")?;
    tracing::debug!(endpoint = %remote.endpoint(), "Discover client ready");
    Ok(PagedLoader::new(
        store,
        Arc::new(remote),
        settings.loader.clone(),
        Handle::current(),
    ))
}

/// Longest quiet period `browse` tolerates while a backfill may be running.
fn idle_timeout(settings: &Settings) -> Duration {
    let attempts = settings.discover.retry.max_retries.saturating_add(1);
    settings
        .discover
        .request_timeout
        .saturating_mul(attempts)
        .saturating_add(IDLE_GRACE)
}

fn print_movie(movie: &Movie) {
    println!(
        "{}  {:>9}  {}",
        movie.release_date(),
        movie.id(),
        movie.title()
    );
}

/// Print up to `pages` pages, returning how many movies were shown.
async fn browse(loader: &PagedLoader, pages: usize, idle: Duration) -> Result<usize> {
    let wanted = pages.max(1).saturating_mul(loader.config().page_size);
    let mut stream = loader.load();
    let mut printed: HashSet<MovieId> = HashSet::new();

    loop {
        let state: MovieListState = match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(state)) => state,
            Ok(None) => break,
            Err(_) => {
                println!("-- no further results ({} shown)", printed.len());
                break;
            }
        };

        match state {
            ResultState::Loading(_) => {
                if stream.remote_exhausted() {
                    println!("-- no results");
                    break;
                }
                println!("-- loading...");
            }
            ResultState::Success(list) => {
                let shown = printed.len();
                for movie in list.iter() {
                    if printed.contains(&movie.id()) {
                        continue;
                    }
                    if printed.len() >= wanted {
                        break;
                    }
                    print_movie(movie);
                    printed.insert(movie.id());
                }
                if printed.len() >= wanted {
                    break;
                }
                if printed.len() == shown && stream.remote_exhausted() {
                    println!("-- end of catalogue ({shown} shown)");
                    break;
                }
                if let Some(last) = list.len().checked_sub(1) {
                    stream.load_around(last);
                }
            }
            ResultState::Error(cause, value) => {
                let cached = value.map_or(0, |list| list.total_count());
                eprintln!("error: {cause} ({cached} cached)");
                break;
            }
        }
    }
    Ok(printed.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    let store = open_store(&settings)?;

    match cli.command {
        Commands::Browse { pages } => {
            let idle = idle_timeout(&settings);
            let loader = build_loader(&settings, store)?;
            let shown = browse(&loader, pages, idle).await?;
            tracing::info!(shown, "Browse finished");
        }
        Commands::Delete { id } => {
            let loader = build_loader(&settings, store)?;
            let removed = loader
                .delete_by_id(MovieId::new(id))
                .await
                .with_context(|| format!("deleting movie {id}"))?;
            if removed == 0 {
                println!("movie {id} is not cached");
            } else {
                println!("deleted movie {id}");
            }
        }
        Commands::Count => {
            let count = store.count().context("counting cached movies")?;
            println!("{count}");
        }
    }

    Ok(())
}
