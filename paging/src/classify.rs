use reel_types::{Movie, MovieListState, PagedList, ResultState};
use serde::Deserialize;

/// How a store snapshot is reported to the consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyPolicy {
    /// Non-empty is `Success`, empty is `Loading`. An empty catalogue stays
    /// `Loading` even after the initial fetch came back empty.
    #[default]
    ItemCount,
    /// Like `ItemCount`, except an empty snapshot after a completed initial
    /// fetch is `Success(empty)`.
    FetchAware,
}

impl ClassifyPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ItemCount => "item_count",
            Self::FetchAware => "fetch_aware",
        }
    }

    pub(crate) fn classify(self, list: PagedList<Movie>, initial_completed: bool) -> MovieListState {
        if !list.is_empty() {
            return ResultState::Success(list);
        }
        match self {
            Self::FetchAware if initial_completed => ResultState::Success(list),
            Self::ItemCount | Self::FetchAware => ResultState::Loading(Some(list)),
        }
    }
}
