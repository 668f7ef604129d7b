//! Progress accounting shared by both transfer directions.

use std::fmt;

use serde::Serialize;

/// Fraction of `total` covered by `transferred`, clamped to `0.0..=1.0`.
///
/// An empty transfer (`total == 0`) is complete from the start.
#[allow(clippy::cast_precision_loss)]
pub fn ratio(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (transferred as f64 / total as f64).min(1.0)
}

/// [`ratio`] expressed as a percentage.
pub fn percent(transferred: u64, total: u64) -> f64 {
    ratio(transferred, total) * 100.0
}

/// A point-in-time view of a transfer's byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Bytes moved so far.
    pub transferred: u64,
    /// Declared size of the file.
    pub total: u64,
}

impl Snapshot {
    /// Creates a snapshot.
    pub const fn new(transferred: u64, total: u64) -> Self {
        Self { transferred, total }
    }

    /// See [`ratio`].
    pub fn ratio(self) -> f64 {
        ratio(self.transferred, self.total)
    }

    /// See [`percent`].
    pub fn percent(self) -> f64 {
        percent(self.transferred, self.total)
    }

    /// Whether every declared byte has been moved.
    pub const fn is_complete(self) -> bool {
        self.transferred >= self.total
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} bytes ({:.1}%)",
            self.transferred,
            self.total,
            self.percent()
        )
    }
}
