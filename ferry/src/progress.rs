//! Progress observers.

use ferry_proto::FileHeader;

/// Receives byte counters while a session moves the body.
///
/// Every session reports `(0, total)` once the header is settled, then
/// `(transferred, total)` after each chunk.
pub trait Progress {
    /// Called once with the negotiated metadata, before any body byte moves.
    fn on_start(&mut self, _header: &FileHeader) {}

    /// Called with the cumulative byte count.
    fn on_progress(&mut self, transferred: u64, total: u64);
}

impl<F: FnMut(u64, u64)> Progress for F {
    fn on_progress(&mut self, transferred: u64, total: u64) {
        self(transferred, total);
    }
}

/// Observer that discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_progress(&mut self, _transferred: u64, _total: u64) {}
}
