//! Cache-first paged loading with one background producer per subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::Stream;
use reel_remote::RemoteSource;
use reel_store::{LocalStore, PagedReader};
use reel_types::{
    Direction, LoadError, Movie, MovieId, MovieListState, PagedList, ResultState, StoreError,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::boundary::{BoundaryCallback, BoundaryEvent};
use crate::slot::LatestSlot;
use crate::{Clock, LoaderConfig, SystemClock};

/// Entry point of the paging core.
///
/// Every [`load`](Self::load) starts an independent subscription with its own
/// boundary guards and remote page cursor. The store is shared.
pub struct PagedLoader {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteSource>,
    clock: Arc<dyn Clock>,
    config: LoaderConfig,
    io: Handle,
}

impl PagedLoader {
    /// Store reads, boundary fetches and producers all run on `io`.
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteSource>,
        config: LoaderConfig,
        io: Handle,
    ) -> Self {
        Self {
            store,
            remote,
            clock: Arc::new(SystemClock),
            config,
            io,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Start a subscription to the cached catalogue.
    ///
    /// The stream re-emits after every committed store change and never ends
    /// on its own. Faults arrive as [`ResultState::Error`].
    #[must_use]
    pub fn load(&self) -> LoadStream {
        let (callback, events) = BoundaryCallback::new(
            Arc::clone(&self.store),
            Arc::clone(&self.remote),
            Arc::clone(&self.clock),
            self.config.look_back,
            self.io.clone(),
        );
        let slot = Arc::new(LatestSlot::new());
        let exhausted = Arc::new(AtomicBool::new(false));
        let (cursor_tx, cursor_rx) = mpsc::unbounded_channel();
        // Subscribe before the first read so no commit slips between them.
        let changes = self.store.subscribe();

        let producer = Producer {
            reader: PagedReader::new(Arc::clone(&self.store), self.config.page_size),
            callback,
            slot: Arc::clone(&slot),
            exhausted: Arc::clone(&exhausted),
            config: self.config.clone(),
            pages: 1,
            last_value: None,
            last_emitted: None,
            initial: InitialFetch::NotStarted,
        };
        let task = self.io.spawn(producer.run(changes, cursor_rx, events));

        LoadStream {
            slot,
            exhausted,
            cursor: LoadCursor { tx: cursor_tx },
            producer: task,
        }
    }

    /// Remove `movie` from the store. Returns the number of rows removed.
    pub async fn delete(&self, movie: &Movie) -> Result<usize, StoreError> {
        self.delete_by_id(movie.id()).await
    }

    pub async fn delete_by_id(&self, id: MovieId) -> Result<usize, StoreError> {
        let store = Arc::clone(&self.store);
        let removed = self
            .io
            .spawn_blocking(move || store.delete_by_id(id))
            .await
            .map_err(|e| StoreError::io(format!("delete task failed: {e}")))??;
        tracing::info!(%id, removed, "Deleted cached movie");
        Ok(removed)
    }
}

/// Reports the consumer's read position to a running subscription.
#[derive(Debug, Clone)]
pub struct LoadCursor {
    tx: mpsc::UnboundedSender<usize>,
}

impl LoadCursor {
    /// The consumer is displaying item `index` of the latest emission.
    ///
    /// Loads further pages as the cursor nears the loaded end and fires the
    /// edge boundaries. A no-op once the subscription has ended.
    pub fn load_around(&self, index: usize) {
        let _ = self.tx.send(index);
    }
}

/// A live subscription: a lazy, ordered, buffer-latest sequence of states.
///
/// Dropping it stops the producer. Boundary fetches already in flight still
/// finish and persist.
pub struct LoadStream {
    slot: Arc<LatestSlot<MovieListState>>,
    exhausted: Arc<AtomicBool>,
    cursor: LoadCursor,
    producer: JoinHandle<()>,
}

impl LoadStream {
    /// Wait for the latest state not yet seen.
    pub async fn next(&mut self) -> Option<MovieListState> {
        self.slot.take().await
    }

    pub fn load_around(&self, index: usize) {
        self.cursor.load_around(index);
    }

    /// Whether the latest initial or end fetch came back empty.
    ///
    /// Every finished boundary fetch is followed by an emission, so a consumer
    /// that asked for more can check this on the next state and stop instead
    /// of waiting for items that will not come.
    #[must_use]
    pub fn remote_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn cursor(&self) -> LoadCursor {
        self.cursor.clone()
    }

    /// Adapt into a [`Stream`] for combinator use.
    pub fn into_stream(self) -> impl Stream<Item = MovieListState> + Send + 'static {
        futures_util::stream::unfold(self, |mut stream| async move {
            let state = stream.next().await?;
            Some((state, stream))
        })
    }

    /// Deliver every state to `sink` on a runtime the consumer chooses.
    ///
    /// Keep a [`cursor`](Self::cursor) first if the consumer needs to report
    /// its position.
    pub fn deliver_on<F>(mut self, handle: &Handle, mut sink: F) -> JoinHandle<()>
    where
        F: FnMut(MovieListState) + Send + 'static,
    {
        handle.spawn(async move {
            while let Some(state) = self.next().await {
                sink(state);
            }
        })
    }
}

impl Drop for LoadStream {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitialFetch {
    NotStarted,
    InFlight,
    Completed,
    Failed,
}

struct Producer {
    reader: PagedReader,
    callback: BoundaryCallback,
    slot: Arc<LatestSlot<MovieListState>>,
    exhausted: Arc<AtomicBool>,
    config: LoaderConfig,
    pages: usize,
    last_value: Option<PagedList<Movie>>,
    last_emitted: Option<MovieListState>,
    initial: InitialFetch,
}

impl Producer {
    async fn run(
        mut self,
        mut changes: watch::Receiver<u64>,
        mut cursor: mpsc::UnboundedReceiver<usize>,
        mut events: mpsc::UnboundedReceiver<BoundaryEvent>,
    ) {
        self.refresh(true).await;

        let mut store_open = true;
        loop {
            tokio::select! {
                changed = changes.changed(), if store_open => {
                    if changed.is_err() {
                        store_open = false;
                        continue;
                    }
                    self.refresh(true).await;
                }
                index = cursor.recv() => {
                    // All cursors gone means the stream was dropped.
                    let Some(index) = index else { break };
                    self.on_cursor(index).await;
                }
                Some(event) = events.recv() => self.on_boundary_event(event).await,
            }
        }

        self.slot.close();
        tracing::debug!("Load subscription ended");
    }

    async fn read(&self) -> Result<PagedList<Movie>, StoreError> {
        let reader = self.reader.clone();
        let pages = self.pages;
        tokio::task::spawn_blocking(move || reader.read(pages))
            .await
            .map_err(|e| StoreError::io(format!("store read task failed: {e}")))?
    }

    async fn refresh(&mut self, skip_unchanged: bool) {
        match self.read().await {
            Ok(list) => {
                if self.initial == InitialFetch::NotStarted && self.last_value.is_none() {
                    if list.is_empty() {
                        self.start_initial_fetch();
                    } else {
                        self.initial = InitialFetch::Completed;
                    }
                }
                let state = self
                    .config
                    .classify
                    .classify(list.clone(), self.initial == InitialFetch::Completed);
                self.last_value = Some(list);
                self.emit(state, skip_unchanged);
            }
            Err(error) => {
                tracing::warn!(%error, "Store read failed");
                let state = ResultState::Error(LoadError::Store(error), self.last_value.clone());
                self.emit(state, false);
            }
        }
    }

    fn start_initial_fetch(&mut self) {
        if self.callback.on_zero_items_loaded().is_some() {
            self.initial = InitialFetch::InFlight;
        }
    }

    async fn on_cursor(&mut self, index: usize) {
        let Some(list) = self.last_value.clone() else {
            return;
        };
        if list.is_empty() {
            // Re-triggering is the only retry for an empty catalogue.
            self.start_initial_fetch();
            return;
        }

        let page_size = self.reader.page_size();
        let wanted = index
            .saturating_add(self.config.prefetch_distance)
            .saturating_add(1)
            .div_ceil(page_size);
        let available = list.total_count().div_ceil(page_size);
        let target = wanted.min(available);
        if target > self.pages {
            tracing::debug!(index, pages = target, "Loading more pages");
            self.pages = target;
            self.refresh(true).await;
        }

        if index.saturating_add(1) >= list.total_count()
            && let Some(last) = list.last()
        {
            self.callback.on_item_at_end_loaded(last);
        }
        if index == 0
            && self.config.bidirectional
            && let Some(first) = list.first()
        {
            self.callback.on_item_at_front_loaded(first);
        }
    }

    async fn on_boundary_event(&mut self, event: BoundaryEvent) {
        match event {
            BoundaryEvent::Completed {
                direction,
                fetched,
                changed,
            } => {
                if direction == Direction::Initial {
                    self.initial = InitialFetch::Completed;
                }
                if direction != Direction::Before {
                    self.exhausted.store(fetched == 0, Ordering::SeqCst);
                }
                // A changed store emits through the change feed. Otherwise
                // repeat the current state so the consumer sees the fetch end.
                self.refresh(changed).await;
            }
            BoundaryEvent::Failed { direction, error } => {
                if direction == Direction::Initial {
                    self.initial = InitialFetch::Failed;
                }
                let state = ResultState::Error(error, self.last_value.clone());
                self.emit(state, false);
            }
        }
    }

    fn emit(&mut self, state: MovieListState, skip_unchanged: bool) {
        if skip_unchanged && self.last_emitted.as_ref() == Some(&state) {
            return;
        }
        tracing::trace!(state = state.label(), "Publishing load state");
        self.last_emitted = Some(state.clone());
        if self.slot.publish(state) {
            tracing::debug!("Superseded unconsumed emission");
        }
    }
}
