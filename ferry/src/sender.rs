//! Sending side of a session.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use ferry_proto::FileHeader;
use tracing::{debug, info};

use crate::Config;
use crate::error::{Error, Result, is_disconnect, transport};
use crate::progress::Progress;
use crate::report::{Direction, Report, Tally};

/// Sends the file at `path` to the receiver listening on `addr`.
///
/// The source is opened before any connection attempt, so a missing file
/// fails with [`Error::SourceNotFound`] without touching the network.
/// Connection failures are not retried.
pub fn send<P>(
    path: impl AsRef<Path>,
    addr: impl ToSocketAddrs,
    config: &Config,
    progress: &mut P,
) -> Result<Report>
where
    P: Progress + ?Sized,
{
    let path = path.as_ref();
    let (mut file, header) = open_source(path, config)?;

    let mut stream = connect(addr, config.connect_timeout)?;
    let peer = stream.peer_addr()?;
    stream.set_write_timeout(config.write_timeout)?;
    info!(%peer, name = %header.name, size = header.size, "connected");

    ferry_proto::encode(&mut stream, &header, config.format)
        .map_err(|e| write_error(e, 0, header.size))?;
    debug!(format = ?config.format, "header sent");

    progress.on_start(&header);
    let tally = stream_body(&mut file, &mut stream, &header, config.chunk(), progress)?;

    stream
        .flush()
        .and_then(|()| stream.shutdown(Shutdown::Write))
        .or_else(|e| match e.kind() {
            io::ErrorKind::NotConnected => Ok(()),
            _ => Err(write_error(e, tally.bytes, header.size)),
        })?;
    info!(%peer, bytes = tally.bytes, "transfer complete");

    Ok(tally.finish(
        Direction::Send,
        &header,
        path.to_path_buf(),
        peer,
        config.format,
    ))
}

/// Opens the source and derives the header it will be announced with.
fn open_source(path: &Path, config: &Config) -> Result<(File, FileHeader)> {
    let not_found = |source| Error::SourceNotFound {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(not_found)?;
    let meta = file.metadata().map_err(not_found)?;
    if !meta.is_file() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let name = path
        .file_name()
        .ok_or_else(|| Error::UnsupportedName(path.display().to_string()))?
        .to_str()
        .ok_or_else(|| Error::UnsupportedName(format!("{} is not valid UTF-8", path.display())))?;
    ferry_proto::validate_name(name, config.format)
        .map_err(|e| Error::UnsupportedName(format!("{name:?}: {e}")))?;

    Ok((file, FileHeader::new(name, meta.len())))
}

/// Connects to the first reachable address `addr` resolves to.
fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| Error::Connection {
            op: "resolve",
            addr: String::from("target address"),
            source,
        })?
        .collect();

    let mut last_err = io::Error::new(io::ErrorKind::InvalidInput, "no addresses to connect to");
    for candidate in &addrs {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(candidate, t),
            None => TcpStream::connect(candidate),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(addr = %candidate, error = %e, "connect attempt failed");
                last_err = e;
            }
        }
    }

    let addr = addrs
        .first()
        .map_or_else(|| String::from("target address"), ToString::to_string);
    if timeout.is_some() && last_err.kind() == io::ErrorKind::TimedOut {
        return Err(Error::Timeout { op: "connect", path: None });
    }
    Err(Error::Connection {
        op: "connect",
        addr,
        source: last_err,
    })
}

/// Copies exactly `header.size` bytes from `file` to `stream`, chunk by chunk.
fn stream_body<P>(
    file: &mut File,
    stream: &mut TcpStream,
    header: &FileHeader,
    chunk: usize,
    progress: &mut P,
) -> Result<Tally>
where
    P: Progress + ?Sized,
{
    let mut tally = Tally::start();
    let mut buf = vec![0u8; usize::try_from(header.size).map_or(chunk, |s| s.min(chunk))];
    progress.on_progress(0, header.size);

    while tally.bytes < header.size {
        let remaining = header.size - tally.bytes;
        let want = usize::try_from(remaining).map_or(chunk, |r| r.min(chunk));
        let n = match file.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "source file shrank to {} of {} bytes while sending",
                        tally.bytes, header.size
                    ),
                )));
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        };

        stream
            .write_all(&buf[..n])
            .map_err(|e| write_error(e, tally.bytes, header.size))?;
        let sent = tally.record(&buf[..n]);
        progress.on_progress(sent, header.size);
    }

    Ok(tally)
}

/// Classifies a failed socket write.
fn write_error(err: io::Error, sent: u64, expected: u64) -> Error {
    if is_disconnect(&err) {
        Error::Interrupted {
            transferred: sent,
            expected,
            path: None,
        }
    } else {
        transport("write", err)
    }
}
