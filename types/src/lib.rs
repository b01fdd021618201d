//! Core domain types for Reel.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod ids;
mod movie;
mod page;
mod state;
mod window;

pub use error::{LoadError, NetworkError, NetworkErrorKind, StoreError, StoreErrorKind};
pub use ids::MovieId;
pub use movie::Movie;
pub use page::{Page, PagedList};
pub use state::ResultState;
pub use window::{BoundaryWindow, DEFAULT_LOOK_BACK_DAYS, Direction, SERVER_DATE_FORMAT};

/// Default number of items per page, matching the database page size of the
/// original catalogue screen.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// The loader's emission type for the movie catalogue.
pub type MovieListState = ResultState<PagedList<Movie>>;
