//! Fakes shared by the paging tests.

use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use reel_remote::{FetchFut, RemoteSource};
use reel_store::{LocalStore, SqliteMovieStore, StoreSnapshot, UpsertSummary};
use reel_types::{BoundaryWindow, Movie, MovieId, NetworkError, StoreError};
use tokio::sync::{Semaphore, watch};

use crate::ManualClock;

pub(crate) fn movie(id: i64, day: u32) -> Movie {
    Movie::new(
        MovieId::new(id),
        format!("Movie {id}"),
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
    )
}

pub(crate) fn movies(ids: RangeInclusive<i64>) -> Vec<Movie> {
    ids.map(|id| movie(id, (id % 28 + 1) as u32)).collect()
}

pub(crate) fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
    ))
}

pub(crate) fn memory_store(seed: &[Movie]) -> Arc<SqliteMovieStore> {
    let store = SqliteMovieStore::open_in_memory().unwrap();
    if !seed.is_empty() {
        store.upsert(seed).unwrap();
    }
    Arc::new(store)
}

/// Poll `check` until it holds or a second passes.
pub(crate) async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

/// Remote that replays queued responses and records every request.
///
/// When gated, each fetch waits for one [`ScriptedRemote::release`] permit.
pub(crate) struct ScriptedRemote {
    responses: Mutex<VecDeque<Result<Vec<Movie>, NetworkError>>>,
    requests: Mutex<Vec<(BoundaryWindow, u32)>>,
    calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedRemote {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub(crate) fn respond(self, response: Result<Vec<Movie>, NetworkError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<(BoundaryWindow, u32)> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn pages(&self) -> Vec<u32> {
        self.requests().into_iter().map(|(_, page)| page).collect()
    }
}

impl RemoteSource for ScriptedRemote {
    fn fetch_window(&self, window: BoundaryWindow, page: u32) -> FetchFut<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push((window, page));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        })
    }
}

/// Store wrapper whose reads or writes can be made to fail.
pub(crate) struct FlakyStore {
    inner: Arc<SqliteMovieStore>,
    reads: AtomicUsize,
    pub(crate) fail_reads: AtomicBool,
    pub(crate) fail_writes: AtomicBool,
    pub(crate) fail_deletes: AtomicBool,
}

impl FlakyStore {
    pub(crate) fn new(inner: Arc<SqliteMovieStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Number of snapshot reads served so far.
    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::io("disk unavailable"));
        }
        Ok(())
    }
}

impl LocalStore for FlakyStore {
    fn count(&self) -> Result<usize, StoreError> {
        self.check_read()?;
        self.inner.count()
    }

    fn read_page(&self, offset: usize, limit: usize) -> Result<Vec<Movie>, StoreError> {
        self.check_read()?;
        self.inner.read_page(offset, limit)
    }

    fn read_prefix(&self, limit: usize) -> Result<StoreSnapshot, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.read_prefix(limit)
    }

    fn upsert(&self, movies: &[Movie]) -> Result<UpsertSummary, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::io("read-only file system"));
        }
        self.inner.upsert(movies)
    }

    fn delete_by_id(&self, id: MovieId) -> Result<usize, StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::io("device busy"));
        }
        self.inner.delete_by_id(id)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}
