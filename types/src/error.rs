//! Failure taxonomy shared by the store, the remote source and the loader.
//!
//! Errors are plain data (`Clone`) so that a failure can travel inside a
//! [`ResultState::Error`](crate::ResultState::Error) emission alongside the
//! last known good snapshot.

use std::fmt;

use thiserror::Error;

/// Category of a remote fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// The request did not complete within its deadline.
    Timeout,
    /// Connection, TLS or other transport-level failure.
    Transport,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The response body could not be decoded.
    Decode,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Transport => f.write_str("transport failure"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Decode => f.write_str("decode failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote fetch failed ({kind}): {message}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
    message: String,
}

impl NetworkError {
    #[must_use]
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Timeout, message)
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Transport, message)
    }

    #[must_use]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Status(code), message)
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Decode, message)
    }

    #[must_use]
    pub const fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Category of a local store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    Io,
    Constraint,
}

impl StoreErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "I/O failure",
            Self::Constraint => "constraint violation",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("local store failed ({kind}): {message}")]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Io, message)
    }

    #[must_use]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Constraint, message)
    }

    #[must_use]
    pub const fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Cause carried by a failed load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoadError {
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
