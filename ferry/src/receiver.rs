//! Receiving side of a session.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::Path;

use ferry_proto::FileHeader;
use ferry_proto::progress::Snapshot;
use socket2::{Domain, SockAddr, Socket, Type};
use tracing::{debug, info, warn};

use crate::Config;
use crate::error::{Error, Result, is_disconnect, is_timeout};
use crate::output;
use crate::progress::Progress;
use crate::report::{Direction, Report, Tally};

/// Pending connections kept by the kernel while waiting in `accept`.
const BACKLOG: i32 = 1;

/// A bound listener waiting for exactly one sender.
///
/// [`accept`](Self::accept) consumes the receiver, so each bind serves a
/// single session.
#[derive(Debug)]
pub struct Receiver {
    /// Listening socket; dropped as soon as a connection is accepted.
    listener: TcpListener,
    /// Session settings.
    config: Config,
}

impl Receiver {
    /// Binds a listening socket on `addr` with `SO_REUSEADDR` set, so a
    /// restarted receiver can rebind a port still in `TIME_WAIT`.
    pub fn bind(addr: impl ToSocketAddrs, config: Config) -> Result<Self> {
        let addrs = addr.to_socket_addrs().map_err(|source| Error::Connection {
            op: "resolve",
            addr: String::from("listen address"),
            source,
        })?;

        let mut last_err = None;
        for candidate in addrs {
            match listen(candidate) {
                Ok(listener) => {
                    info!(addr = %candidate, "listening");
                    return Ok(Self { listener, config });
                }
                Err(source) => {
                    last_err = Some(Error::Connection {
                        op: "bind",
                        addr: candidate.to_string(),
                        source,
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Connection {
            op: "bind",
            addr: String::from("listen address"),
            source: io::Error::new(io::ErrorKind::InvalidInput, "no addresses to bind"),
        }))
    }

    /// Address the listener is bound to (useful after binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for one sender and receives its file into `config.dest_dir`.
    ///
    /// Stops listening once a connection is accepted. If the sender
    /// disconnects early, the partial output file is kept on disk and
    /// [`Error::Interrupted`] names it.
    pub fn accept<P>(self, progress: &mut P) -> Result<Report>
    where
        P: Progress + ?Sized,
    {
        let Self { listener, config } = self;
        let local = listener.local_addr()?;
        let (mut stream, peer) = listener.accept().map_err(|source| Error::Connection {
            op: "accept",
            addr: local.to_string(),
            source,
        })?;
        drop(listener);
        info!(%peer, "connection accepted");

        stream.set_read_timeout(config.read_timeout)?;
        session(&mut stream, peer, &config, progress)
    }
}

/// Receives a single file on `addr`: [`Receiver::bind`] then [`Receiver::accept`].
pub fn receive<P>(addr: impl ToSocketAddrs, config: Config, progress: &mut P) -> Result<Report>
where
    P: Progress + ?Sized,
{
    Receiver::bind(addr, config)?.accept(progress)
}

/// Creates a reusable-address listener on `addr`.
fn listen(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&SockAddr::from(addr))?;
    socket.listen(BACKLOG)?;
    Ok(socket.into())
}

/// Runs one accepted session to completion.
fn session<P>(
    stream: &mut TcpStream,
    peer: SocketAddr,
    config: &Config,
    progress: &mut P,
) -> Result<Report>
where
    P: Progress + ?Sized,
{
    let header = ferry_proto::decode(&mut *stream, config.format).map_err(header_error)?;
    debug!(name = %header.name, size = header.size, format = ?config.format, "header received");

    let path = output::resolve(&config.dest_dir, &header.name, config.max_suffix)?;
    let mut file = output::create_new(&path)?;
    info!(path = %path.display(), size = header.size, "writing");

    progress.on_start(&header);
    let tally = read_body(stream, &mut file, &header, &path, config.chunk(), progress)?;
    file.flush()?;

    info!(%peer, path = %path.display(), bytes = tally.bytes, "transfer complete");
    Ok(tally.finish(Direction::Receive, &header, path, peer, config.format))
}

/// Reads exactly `header.size` body bytes into `file`.
///
/// Never asks the socket for more than the bytes still owed, so anything
/// the peer sends after the body stays unread.
fn read_body<P>(
    stream: &mut TcpStream,
    file: &mut File,
    header: &FileHeader,
    path: &Path,
    chunk: usize,
    progress: &mut P,
) -> Result<Tally>
where
    P: Progress + ?Sized,
{
    let mut tally = Tally::start();
    let mut buf = vec![0u8; usize::try_from(header.size).map_or(chunk, |s| s.min(chunk))];
    progress.on_progress(0, header.size);

    let mut stalled = false;
    while tally.bytes < header.size {
        let remaining = header.size - tally.bytes;
        let want = usize::try_from(remaining).map_or(chunk, |r| r.min(chunk));
        let n = match stream.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_disconnect(&e) => {
                debug!(error = %e, "connection dropped");
                break;
            }
            Err(e) if is_timeout(&e) => {
                stalled = true;
                break;
            }
            Err(e) => return Err(Error::Io(e)),
        };

        file.write_all(&buf[..n])?;
        let received = tally.record(&buf[..n]);
        progress.on_progress(received, header.size);
    }

    if tally.bytes < header.size {
        file.flush()?;
        warn!(
            path = %path.display(),
            progress = %Snapshot::new(tally.bytes, header.size),
            stalled,
            "body incomplete, keeping partial file"
        );
        if stalled {
            return Err(Error::Timeout {
                op: "read",
                path: Some(path.to_path_buf()),
            });
        }
        return Err(Error::Interrupted {
            transferred: tally.bytes,
            expected: header.size,
            path: Some(path.to_path_buf()),
        });
    }
    Ok(tally)
}

/// Classifies a failed header read.
fn header_error(err: io::Error) -> Error {
    if is_timeout(&err) {
        return Error::Timeout { op: "read header", path: None };
    }
    match err.kind() {
        io::ErrorKind::UnexpectedEof => {
            Error::MalformedHeader(String::from("connection closed inside the header"))
        }
        io::ErrorKind::InvalidData => Error::MalformedHeader(err.to_string()),
        _ if is_disconnect(&err) => {
            Error::MalformedHeader(format!("connection lost inside the header: {err}"))
        }
        _ => Error::Io(err),
    }
}
