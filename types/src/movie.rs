//! The cached catalogue entity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::MovieId;

/// A movie as persisted in the local store.
///
/// Values are immutable once built; a newer fetch of the same id replaces the
/// stored row wholesale rather than patching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    id: MovieId,
    title: String,
    overview: String,
    poster_path: Option<String>,
    release_date: NaiveDate,
    vote_average: f64,
    popularity: f64,
}

impl Movie {
    #[must_use]
    pub fn new(id: MovieId, title: impl Into<String>, release_date: NaiveDate) -> Self {
        Self {
            id,
            title: title.into(),
            overview: String::new(),
            poster_path: None,
            release_date,
            vote_average: 0.0,
            popularity: 0.0,
        }
    }

    #[must_use]
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    #[must_use]
    pub fn with_poster_path(mut self, poster_path: Option<String>) -> Self {
        self.poster_path = poster_path;
        self
    }

    #[must_use]
    pub fn with_vote_average(mut self, vote_average: f64) -> Self {
        self.vote_average = vote_average;
        self
    }

    #[must_use]
    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    #[must_use]
    pub const fn id(&self) -> MovieId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn overview(&self) -> &str {
        &self.overview
    }

    #[must_use]
    pub fn poster_path(&self) -> Option<&str> {
        self.poster_path.as_deref()
    }

    #[must_use]
    pub const fn release_date(&self) -> NaiveDate {
        self.release_date
    }

    #[must_use]
    pub const fn vote_average(&self) -> f64 {
        self.vote_average
    }

    #[must_use]
    pub const fn popularity(&self) -> f64 {
        self.popularity
    }
}
