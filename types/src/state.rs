//! Lifecycle of an asynchronous paged load.

use crate::LoadError;

/// One emission of a loader.
///
/// Exactly one variant is active. "No data yet" is always `None`, so a
/// consumer can render stale data next to an error instead of blanking.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultState<T> {
    /// Data is incomplete or a fetch is in flight.
    Loading(Option<T>),
    /// A stable snapshot, non-empty under the default classification.
    Success(T),
    /// An upstream operation failed; carries the last known good value.
    Error(LoadError, Option<T>),
}

impl<T> ResultState<T> {
    /// The data carried by this state, whatever the variant.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Loading(partial) => partial.as_ref(),
            Self::Success(value) => Some(value),
            Self::Error(_, value) => value.as_ref(),
        }
    }

    #[must_use]
    pub const fn cause(&self) -> Option<&LoadError> {
        match self {
            Self::Error(cause, _) => Some(cause),
            Self::Loading(_) | Self::Success(_) => None,
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(..))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultState<U> {
        match self {
            Self::Loading(partial) => ResultState::Loading(partial.map(f)),
            Self::Success(value) => ResultState::Success(f(value)),
            Self::Error(cause, value) => ResultState::Error(cause, value.map(f)),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading(_) => "loading",
            Self::Success(_) => "success",
            Self::Error(..) => "error",
        }
    }
}
