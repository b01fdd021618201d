//! SQLite-backed movie cache.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use reel_types::{Movie, MovieId, StoreError};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::watch;

use crate::sqlite_util::{map_sqlite_error, open_secure_db};
use crate::{ChangeFeed, LocalStore, StoreSnapshot, UpsertSummary};

/// Persistent store for cached movies.
///
/// A single connection guarded by a mutex serializes every read and write;
/// loaders share the store through `Arc<dyn LocalStore>`.
pub struct SqliteMovieStore {
    db: Mutex<Connection>,
    changes: ChangeFeed,
}

impl SqliteMovieStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS movies (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            overview TEXT NOT NULL DEFAULT '',
            poster_path TEXT,
            release_date TEXT NOT NULL,
            vote_average REAL NOT NULL DEFAULT 0,
            popularity REAL NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_movies_release
        ON movies(release_date DESC, id ASC);
    ";

    const UPSERT: &'static str = r"
        INSERT INTO movies (id, title, overview, poster_path, release_date, vote_average, popularity)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            overview = excluded.overview,
            poster_path = excluded.poster_path,
            release_date = excluded.release_date,
            vote_average = excluded.vote_average,
            popularity = excluded.popularity
        WHERE title IS NOT excluded.title
           OR overview IS NOT excluded.overview
           OR poster_path IS NOT excluded.poster_path
           OR release_date IS NOT excluded.release_date
           OR vote_average IS NOT excluded.vote_average
           OR popularity IS NOT excluded.popularity
    ";

    /// Open or create the movie cache at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = open_secure_db(path)?;
        tracing::debug!(path = %path.display(), "Opened movie cache");
        Self::initialize(db)
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory()
            .map_err(|e| map_sqlite_error("open in-memory database", &e))?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| map_sqlite_error("set movie cache pragmas", &e))?;
        db.execute_batch(Self::SCHEMA)
            .map_err(|e| map_sqlite_error("create movie cache schema", &e))?;
        Ok(Self {
            db: Mutex::new(db),
            changes: ChangeFeed::new(),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a single movie by id.
    pub fn get(&self, id: MovieId) -> Result<Option<Movie>, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, title, overview, poster_path, release_date, vote_average, popularity
                 FROM movies WHERE id = ?1",
                [id.value()],
                movie_from_row,
            )
            .optional()
            .map_err(|e| map_sqlite_error("get movie", &e))
    }

    /// Current change version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.changes.version()
    }

    /// Delete every cached movie.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM movies", [])
            .map_err(|e| map_sqlite_error("clear movies", &e))?;
        if removed > 0 {
            self.changes.bump();
        }
        Ok(removed)
    }
}

fn count_rows(conn: &Connection) -> Result<usize, StoreError> {
    conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get::<_, i64>(0))
        .map(|n| n as usize)
        .map_err(|e| map_sqlite_error("count movies", &e))
}

fn select_page(conn: &Connection, offset: usize, limit: usize) -> Result<Vec<Movie>, StoreError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, title, overview, poster_path, release_date, vote_average, popularity
             FROM movies
             ORDER BY release_date DESC, id ASC
             LIMIT ?1 OFFSET ?2",
        )
        .map_err(|e| map_sqlite_error("prepare page query", &e))?;

    let rows = stmt
        .query_map(params![limit as i64, offset as i64], movie_from_row)
        .map_err(|e| map_sqlite_error("query page", &e))?;

    rows.map(|row| row.map_err(|e| map_sqlite_error("read movie row", &e)))
        .collect()
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    let id: i64 = row.get(0)?;
    let title: String = row.get(1)?;
    Ok(Movie::new(MovieId::new(id), title, row.get(4)?)
        .with_overview(row.get::<_, String>(2)?)
        .with_poster_path(row.get(3)?)
        .with_vote_average(row.get(5)?)
        .with_popularity(row.get(6)?))
}

impl LocalStore for SqliteMovieStore {
    fn count(&self) -> Result<usize, StoreError> {
        count_rows(&self.conn())
    }

    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<Movie>, StoreError> {
        select_page(&self.conn(), offset, limit)
    }

    fn read_prefix(&self, limit: usize) -> Result<StoreSnapshot, StoreError> {
        let conn = self.conn();
        let total_count = count_rows(&conn)?;
        let items = select_page(&conn, 0, limit)?;
        Ok(StoreSnapshot { items, total_count })
    }

    fn upsert(&self, movies: &[Movie]) -> Result<UpsertSummary, StoreError> {
        if movies.is_empty() {
            return Ok(UpsertSummary::default());
        }

        let summary = {
            let mut conn = self.conn();
            let tx = conn
                .transaction()
                .map_err(|e| map_sqlite_error("begin upsert", &e))?;

            let before = count_rows(&tx)?;
            let mut touched = 0usize;
            {
                let mut stmt = tx
                    .prepare_cached(Self::UPSERT)
                    .map_err(|e| map_sqlite_error("prepare upsert", &e))?;
                for movie in movies {
                    touched += stmt
                        .execute(params![
                            movie.id().value(),
                            movie.title(),
                            movie.overview(),
                            movie.poster_path(),
                            movie.release_date(),
                            movie.vote_average(),
                            movie.popularity(),
                        ])
                        .map_err(|e| map_sqlite_error("upsert movie", &e))?;
                }
            }
            let after = count_rows(&tx)?;
            tx.commit()
                .map_err(|e| map_sqlite_error("commit upsert", &e))?;

            let inserted = after.saturating_sub(before);
            UpsertSummary {
                inserted,
                updated: touched.saturating_sub(inserted),
            }
        };

        if summary.changed() {
            let version = self.changes.bump();
            tracing::debug!(
                inserted = summary.inserted,
                updated = summary.updated,
                version,
                "Movie cache updated"
            );
        }
        Ok(summary)
    }

    fn delete_by_id(&self, id: MovieId) -> Result<usize, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM movies WHERE id = ?1", [id.value()])
            .map_err(|e| map_sqlite_error("delete movie", &e))?;
        if removed > 0 {
            self.changes.bump();
        }
        Ok(removed)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
