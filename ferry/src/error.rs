//! Error types for ferry transfers.

use std::io;
use std::path::{Path, PathBuf};

/// Alias for `Result<T, ferry::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a transfer session.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The file to send does not exist, is not a regular file, or is unreadable.
    #[error("cannot read source file {}: {source}", .path.display())]
    SourceNotFound {
        /// Path given by the caller.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The source file name cannot be carried in a header.
    #[error("unsupported file name: {0}")]
    UnsupportedName(String),

    /// Connecting, binding, listening or accepting failed.
    #[error("{op} {addr}: {source}")]
    Connection {
        /// The socket operation that failed.
        op: &'static str,
        /// Endpoint involved in the operation.
        addr: String,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The peer sent a header that could not be read or parsed.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The connection closed before the declared body length was moved.
    #[error("connection closed after {transferred} of {expected} bytes")]
    Interrupted {
        /// Body bytes moved before the connection closed.
        transferred: u64,
        /// Declared body length.
        expected: u64,
        /// Partial output file left on disk (receiver only).
        path: Option<PathBuf>,
    },

    /// A socket deadline expired.
    #[error("{op} timed out{}", partial_note(.path.as_deref()))]
    Timeout {
        /// The socket operation that stalled.
        op: &'static str,
        /// Partial output file left on disk when the body stalled (receiver only).
        path: Option<PathBuf>,
    },

    /// A local filesystem or socket I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn partial_note(path: Option<&Path>) -> String {
    path.map(|p| format!(", partial file kept at {}", p.display()))
        .unwrap_or_default()
}

/// Whether `err` means the peer is gone rather than a local failure.
pub(crate) fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Whether `err` is an expired socket deadline.
///
/// Unix reports a timed-out blocking read as `WouldBlock`.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Maps a socket error raised during `op` onto the error taxonomy.
pub(crate) fn transport(op: &'static str, err: io::Error) -> Error {
    if is_timeout(&err) {
        Error::Timeout { op, path: None }
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_the_partial_file() {
        let err = Error::Timeout {
            op: "read",
            path: Some(PathBuf::from("in/slow.bin")),
        };
        assert_eq!(err.to_string(), "read timed out, partial file kept at in/slow.bin");

        let err = transport("write", io::ErrorKind::WouldBlock.into());
        assert_eq!(err.to_string(), "write timed out");
    }
}
