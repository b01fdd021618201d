//! Remote fetch windows and paging directions.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Date format the remote catalogue expects for window bounds.
pub const SERVER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Look-back used when none is configured: two weeks.
pub const DEFAULT_LOOK_BACK_DAYS: i64 = 14;

/// Half-open time range `[from, to)` bounding a remote fetch.
///
/// Always derived from "now" at the moment a boundary fires, never cached,
/// so successive windows slide forward with the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl BoundaryWindow {
    /// The window `[now - look_back, now)`.
    #[must_use]
    pub fn ending_at(now: DateTime<Utc>, look_back: Duration) -> Self {
        Self {
            from: now - look_back,
            to: now,
        }
    }

    /// Lower bound in server format (`yyyy-MM-dd`).
    #[must_use]
    pub fn start_param(&self) -> String {
        self.from.format(SERVER_DATE_FORMAT).to_string()
    }

    /// Upper bound in server format (`yyyy-MM-dd`).
    #[must_use]
    pub fn end_param(&self) -> String {
        self.to.format(SERVER_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for BoundaryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.end_param())
    }
}

/// Which edge of the cached window a boundary fetch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The store was empty on first load.
    Initial,
    /// The cursor reached the last cached item.
    After,
    /// The cursor reached the first cached item.
    Before,
}

impl Direction {
    pub const ALL: [Self; 3] = [Self::Initial, Self::After, Self::Before];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::After => "after",
            Self::Before => "before",
        }
    }

    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Initial => 0,
            Self::After => 1,
            Self::Before => 2,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
