//! Summary of a completed session.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ferry_proto::{FileHeader, HeaderFormat};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Which side of the session produced a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Direction {
    /// The file was sent.
    Send,
    /// The file was received.
    Receive,
}

/// Outcome of a session that moved every declared byte.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Report {
    /// Direction of the transfer.
    pub direction: Direction,
    /// File name carried in the header.
    pub name: String,
    /// Local file: the source when sending, the output when receiving.
    pub path: PathBuf,
    /// Body bytes moved; always equal to the declared size.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the body bytes.
    pub sha256: String,
    /// Remote endpoint.
    pub peer: SocketAddr,
    /// Header encoding used on the wire.
    pub format: HeaderFormat,
    /// Wall-clock time spent streaming the body, after the header exchange.
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

/// Running state used to build a [`Report`] while the body streams.
pub(crate) struct Tally {
    /// Hash over every body byte seen so far.
    hasher: Sha256,
    /// Body bytes seen so far.
    pub(crate) bytes: u64,
    /// Session start.
    started: Instant,
}

impl Tally {
    /// Starts the clock.
    pub(crate) fn start() -> Self {
        Self {
            hasher: Sha256::new(),
            bytes: 0,
            started: Instant::now(),
        }
    }

    /// Accounts for one chunk and returns the new running total.
    pub(crate) fn record(&mut self, chunk: &[u8]) -> u64 {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
        self.bytes
    }

    /// Seals the tally into a report.
    pub(crate) fn finish(
        self,
        direction: Direction,
        header: &FileHeader,
        path: PathBuf,
        peer: SocketAddr,
        format: HeaderFormat,
    ) -> Report {
        Report {
            direction,
            name: header.name.clone(),
            path,
            bytes: self.bytes,
            sha256: hex::encode(self.hasher.finalize().as_slice()),
            peer,
            format,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Serializes a duration as whole milliseconds.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
