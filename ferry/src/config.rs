//! Session configuration.

use std::path::PathBuf;
use std::time::Duration;

use ferry_proto::{CHUNK_SIZE, HeaderFormat};

/// Default cap on numeric suffixes tried when the output name is taken.
pub(crate) const DEFAULT_MAX_SUFFIX: u32 = 10_000;

/// Largest accepted chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Tunables shared by the sender and the receiver.
///
/// The defaults match the baseline protocol: binary header, 8 KiB chunks,
/// no socket deadlines, output written to the current directory.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Header encoding; both peers must agree.
    pub format: HeaderFormat,
    /// Upper bound for a single read or write of body data.
    pub chunk_size: usize,
    /// Deadline for establishing the outbound connection.
    pub connect_timeout: Option<Duration>,
    /// Deadline for each socket read.
    pub read_timeout: Option<Duration>,
    /// Deadline for each socket write.
    pub write_timeout: Option<Duration>,
    /// Directory the receiver writes into.
    pub dest_dir: PathBuf,
    /// Highest numeric suffix tried before giving up on a free name.
    pub max_suffix: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: HeaderFormat::default(),
            chunk_size: CHUNK_SIZE,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            dest_dir: PathBuf::from("."),
            max_suffix: DEFAULT_MAX_SUFFIX,
        }
    }
}

impl Config {
    /// Sets the header encoding.
    #[must_use]
    pub fn with_format(mut self, format: HeaderFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the chunk size, clamped to `1..=MAX_CHUNK_SIZE`.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Sets the connect deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets both the read and the write deadline.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self.write_timeout = timeout;
        self
    }

    /// Sets the receiver's destination directory.
    #[must_use]
    pub fn with_dest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = dir.into();
        self
    }

    /// Sets the collision suffix cap.
    #[must_use]
    pub fn with_max_suffix(mut self, max_suffix: u32) -> Self {
        self.max_suffix = max_suffix;
        self
    }

    /// Chunk size clamped to `1..=MAX_CHUNK_SIZE`; the field is public, so
    /// the setter alone does not guarantee the bounds.
    pub(crate) fn chunk(&self) -> usize {
        self.chunk_size.clamp(1, MAX_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.format, HeaderFormat::Binary);
        assert_eq!(config.chunk_size, 8192);
        assert!(config.read_timeout.is_none());
        assert_eq!(config.dest_dir, PathBuf::from("."));
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        assert_eq!(Config::default().with_chunk_size(0).chunk(), 1);
    }

    #[test]
    fn oversized_chunk_size_is_capped() {
        let config = Config::default().with_chunk_size(usize::MAX / 2);
        assert_eq!(config.chunk_size, MAX_CHUNK_SIZE);

        let mut raw = Config::default();
        raw.chunk_size = usize::MAX;
        assert_eq!(raw.chunk(), MAX_CHUNK_SIZE);
    }

    #[test]
    fn io_timeout_sets_both_directions() {
        let t = Some(Duration::from_secs(3));
        let config = Config::default().with_io_timeout(t);
        assert_eq!(config.read_timeout, t);
        assert_eq!(config.write_timeout, t);
    }
}
