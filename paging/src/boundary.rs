//! Boundary-triggered remote backfill.
//!
//! A [`BoundaryCallback`] watches the three edges of the cached window
//! (empty on first load, end reached, front reached) and extends the local
//! store from the remote catalogue. Each edge has its own guard: while a
//! direction is fetching, further triggers for it are dropped. Different
//! directions may fetch concurrently.
//!
//! # Remote page cursor
//!
//! Initial and front fetches ask for remote page 1 of a freshly computed
//! window. End fetches walk forward: every end fetch that returned items moves
//! the cursor to the next remote page. An end fetch that returns nothing
//! leaves the cursor where it is.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use reel_remote::RemoteSource;
use reel_store::{LocalStore, UpsertSummary};
use reel_types::{BoundaryWindow, Direction, LoadError, Movie, StoreError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Clock;

/// Per-direction lifecycle of a boundary fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryState {
    Idle,
    FetchingInitial,
    FetchingAfter,
    FetchingBefore,
    /// The last fetch for this direction failed. The next trigger retries.
    Failed(LoadError),
}

impl BoundaryState {
    const fn fetching(direction: Direction) -> Self {
        match direction {
            Direction::Initial => Self::FetchingInitial,
            Direction::After => Self::FetchingAfter,
            Direction::Before => Self::FetchingBefore,
        }
    }

    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        matches!(
            self,
            Self::FetchingInitial | Self::FetchingAfter | Self::FetchingBefore
        )
    }
}

/// Outcome of a boundary fetch, published to the owning loader.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryEvent {
    /// Fetched items (possibly zero) were persisted. `changed` is false when
    /// the store already held every fetched row as-is.
    Completed {
        direction: Direction,
        fetched: usize,
        changed: bool,
    },
    /// The fetch or the persist failed. The store is unchanged.
    Failed { direction: Direction, error: LoadError },
}

impl BoundaryEvent {
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Completed { direction, .. } | Self::Failed { direction, .. } => *direction,
        }
    }
}

struct Guards {
    slots: [Mutex<BoundaryState>; 3],
    next_remote_page: AtomicU32,
}

impl Guards {
    fn new() -> Self {
        Self {
            slots: Direction::ALL.map(|_| Mutex::new(BoundaryState::Idle)),
            next_remote_page: AtomicU32::new(1),
        }
    }

    fn slot(&self, direction: Direction) -> MutexGuard<'_, BoundaryState> {
        self.slots[direction.slot()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, direction: Direction, state: BoundaryState) {
        *self.slot(direction) = state;
    }

    fn page_for(&self, direction: Direction) -> u32 {
        match direction {
            Direction::After => self.next_remote_page.load(Ordering::SeqCst),
            Direction::Initial | Direction::Before => 1,
        }
    }

    fn record_success(&self, direction: Direction, page: u32, fetched: usize) {
        if fetched == 0 {
            return;
        }
        match direction {
            Direction::After => {
                // Only advance past the page that was actually requested.
                let _ = self.next_remote_page.compare_exchange(
                    page,
                    page.saturating_add(1),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
            }
            Direction::Initial => {
                self.next_remote_page.fetch_max(2, Ordering::SeqCst);
            }
            Direction::Before => {}
        }
    }
}

/// Detects exhaustion of the cached window and backfills it remotely.
///
/// One callback belongs to one load subscription.
pub struct BoundaryCallback {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSource>,
    clock: Arc<dyn Clock>,
    look_back: Duration,
    io: Handle,
    guards: Arc<Guards>,
    events: mpsc::UnboundedSender<BoundaryEvent>,
}

impl BoundaryCallback {
    /// Build a callback whose fetches run on `io`. Outcomes arrive on the
    /// returned receiver; dropping it does not cancel fetches.
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSource>,
        clock: Arc<dyn Clock>,
        look_back: Duration,
        io: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<BoundaryEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let callback = Self {
            store,
            remote,
            clock,
            look_back,
            io,
            guards: Arc::new(Guards::new()),
            events,
        };
        (callback, rx)
    }

    /// The store reported zero items on first load.
    pub fn on_zero_items_loaded(&self) -> Option<JoinHandle<()>> {
        self.trigger(Direction::Initial)
    }

    /// The read cursor reached the last cached item.
    pub fn on_item_at_end_loaded(&self, item: &Movie) -> Option<JoinHandle<()>> {
        tracing::debug!(id = %item.id(), "End of cached window reached");
        self.trigger(Direction::After)
    }

    /// The read cursor reached the first cached item.
    pub fn on_item_at_front_loaded(&self, item: &Movie) -> Option<JoinHandle<()>> {
        tracing::debug!(id = %item.id(), "Front of cached window reached");
        self.trigger(Direction::Before)
    }

    #[must_use]
    pub fn state(&self, direction: Direction) -> BoundaryState {
        self.guards.slot(direction).clone()
    }

    /// Remote page the next end fetch will request.
    #[must_use]
    pub fn next_remote_page(&self) -> u32 {
        self.guards.next_remote_page.load(Ordering::SeqCst)
    }

    /// Start a fetch for `direction` unless one is already running.
    ///
    /// Returns the fetch task, or `None` when the trigger was suppressed.
    pub fn trigger(&self, direction: Direction) -> Option<JoinHandle<()>> {
        {
            let mut slot = self.guards.slot(direction);
            if slot.is_fetching() {
                tracing::debug!(%direction, "Boundary trigger suppressed, fetch in flight");
                return None;
            }
            *slot = BoundaryState::fetching(direction);
        }

        let window = BoundaryWindow::ending_at(self.clock.now(), self.look_back);
        let page = self.guards.page_for(direction);
        tracing::debug!(%direction, %window, page, "Boundary fetch started");

        let task = FetchTask {
            direction,
            window,
            page,
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            guards: Arc::clone(&self.guards),
            events: self.events.clone(),
        };
        Some(self.io.spawn(task.run()))
    }
}

struct FetchTask {
    direction: Direction,
    window: BoundaryWindow,
    page: u32,
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSource>,
    guards: Arc<Guards>,
    events: mpsc::UnboundedSender<BoundaryEvent>,
}

impl FetchTask {
    async fn run(self) {
        let direction = self.direction;
        let outcome = match self.remote.fetch_window(self.window, self.page).await {
            Ok(movies) => persist(Arc::clone(&self.store), movies).await,
            Err(e) => Err(LoadError::Network(e)),
        };

        let event = match outcome {
            Ok((fetched, summary)) => {
                self.guards.record_success(direction, self.page, fetched);
                tracing::info!(
                    %direction,
                    window = %self.window,
                    page = self.page,
                    fetched,
                    inserted = summary.inserted,
                    updated = summary.updated,
                    exhausted = fetched == 0,
                    "Boundary fetch completed"
                );
                self.guards.set(direction, BoundaryState::Idle);
                BoundaryEvent::Completed {
                    direction,
                    fetched,
                    changed: summary.changed(),
                }
            }
            Err(error) => {
                tracing::warn!(%direction, page = self.page, %error, "Boundary fetch failed");
                self.guards
                    .set(direction, BoundaryState::Failed(error.clone()));
                BoundaryEvent::Failed { direction, error }
            }
        };

        // The subscriber may be gone; the store already has the items.
        let _ = self.events.send(event);
    }
}

async fn persist(
    store: Arc<dyn LocalStore>,
    movies: Vec<Movie>,
) -> Result<(usize, UpsertSummary), LoadError> {
    let fetched = movies.len();
    if fetched == 0 {
        return Ok((0, UpsertSummary::default()));
    }
    let summary = tokio::task::spawn_blocking(move || store.upsert(&movies))
        .await
        .map_err(|e| StoreError::io(format!("persist task failed: {e}")))??;
    Ok((fetched, summary))
}
