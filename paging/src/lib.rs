//! Cache-first paged loading.
//!
//! The local store is the single source of truth for what a consumer sees.
//! The remote catalogue only ever writes into the store; the store's change
//! feed then drives a fresh emission.
//!
//! ```text
//! consumer ──load_around(i)──▶ producer ──trigger──▶ BoundaryCallback
//!    ▲                           │   ▲                      │
//!    │ next()                    │   │ change feed          │ fetch_window
//!    │                           ▼   │                      ▼
//! LatestSlot ◀──ResultState── PagedReader ◀──upsert── RemoteSource
//! ```
//!
//! - [`PagedLoader`] hands out independent [`LoadStream`]s.
//! - [`BoundaryCallback`] owns the per-direction fetch guards and the remote
//!   page cursor for one stream.
//! - [`ClassifyPolicy`] maps a snapshot to a [`ResultState`](reel_types::ResultState).

mod boundary;
mod classify;
mod clock;
mod loader;
mod slot;

#[cfg(test)]
mod testing;

use chrono::Duration;
use reel_types::{DEFAULT_LOOK_BACK_DAYS, DEFAULT_PAGE_SIZE};

pub use boundary::{BoundaryCallback, BoundaryEvent, BoundaryState};
pub use classify::ClassifyPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use loader::{LoadCursor, LoadStream, PagedLoader};

/// Items ahead of the cursor that must already be loaded.
pub const DEFAULT_PREFETCH_DISTANCE: usize = 5;

/// Tunables for one [`PagedLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub page_size: usize,
    pub prefetch_distance: usize,
    pub look_back: Duration,
    pub bidirectional: bool,
    pub classify: ClassifyPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_distance: DEFAULT_PREFETCH_DISTANCE,
            look_back: Duration::days(DEFAULT_LOOK_BACK_DAYS),
            bidirectional: false,
            classify: ClassifyPolicy::default(),
        }
    }
}
