//! Local movie cache.
//!
//! This crate provides:
//! - The [`LocalStore`] contract the paging core reads from and writes to
//! - [`ChangeFeed`], the version counter stores bump after every committed write
//! - [`PagedReader`], the page-granular read handle handed to loaders
//! - [`SqliteMovieStore`], the SQLite-backed implementation
//!
//! # Architecture
//!
//! ```text
//! Arc<dyn LocalStore>  (shared by every loader)
//! ├── read_prefix / count   (consistent snapshot of the ordered cache)
//! ├── upsert / delete       (store owns write serialization)
//! └── subscribe             (watch::Receiver<u64>, bumped per committed change)
//! ```
//!
//! Every method is blocking; async callers run them on the blocking pool.

mod sqlite;
mod sqlite_util;

use std::sync::Arc;

use reel_types::{Movie, MovieId, PagedList, StoreError};
use tokio::sync::watch;

pub use sqlite::SqliteMovieStore;

/// Result of a prefix read: the first `limit` items plus the total held.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub items: Vec<Movie>,
    pub total_count: usize,
}

/// Rows touched by an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Ids that were not present before.
    pub inserted: usize,
    /// Existing ids whose stored values changed.
    pub updated: usize,
}

impl UpsertSummary {
    #[must_use]
    pub const fn changed(self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Ordered, paged access to cached movies.
///
/// The ordering is release date descending, ties broken by id ascending.
/// Implementations must make committed writes visible to the next read and
/// bump their [`ChangeFeed`] after any write that changed rows.
pub trait LocalStore: Send + Sync {
    fn count(&self) -> Result<usize, StoreError>;

    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<Movie>, StoreError>;

    /// Read the first `limit` items together with the total count.
    ///
    /// The default reads the two separately; implementations that can do so
    /// should answer both from one consistent view.
    fn read_prefix(&self, limit: usize) -> Result<StoreSnapshot, StoreError> {
        let total_count = self.count()?;
        let items = self.read_page(0, limit)?;
        Ok(StoreSnapshot { items, total_count })
    }

    /// Insert or replace by id. Idempotent.
    fn upsert(&self, movies: &[Movie]) -> Result<UpsertSummary, StoreError>;

    /// Remove `movie`, returning the number of rows deleted (0 when absent).
    fn delete(&self, movie: &Movie) -> Result<usize, StoreError> {
        self.delete_by_id(movie.id())
    }

    fn delete_by_id(&self, id: MovieId) -> Result<usize, StoreError>;

    /// Receiver of the store's change version.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// Monotonic change counter shared between a store and its subscribers.
#[derive(Debug)]
pub struct ChangeFeed {
    tx: watch::Sender<u64>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Record a committed change and wake subscribers.
    pub fn bump(&self) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|current| {
            *current += 1;
            version = *current;
        });
        version
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Page-granular read handle over a shared store.
#[derive(Clone)]
pub struct PagedReader {
    store: Arc<dyn LocalStore>,
    page_size: usize,
}

impl PagedReader {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Snapshot of the first `pages` pages of the store.
    pub fn read(&self, pages: usize) -> Result<PagedList<Movie>, StoreError> {
        let limit = pages.max(1).saturating_mul(self.page_size);
        let snapshot = self.store.read_prefix(limit)?;
        Ok(PagedList::from_items(
            snapshot.items,
            self.page_size,
            snapshot.total_count,
        ))
    }
}
