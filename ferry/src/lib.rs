//! Point-to-point single file transfer over TCP.
//!
//! One sender, one receiver, one file per session. The sender announces the
//! file's name and size in a [`FileHeader`], then streams exactly `size`
//! body bytes; the receiver writes them to a fresh, collision-free path.
//!
//! # Quick start
//!
//! ```no_run
//! use ferry::{Config, NoProgress, Receiver};
//!
//! // Receiving side.
//! let receiver = Receiver::bind("0.0.0.0:9000", Config::default())?;
//! let report = receiver.accept(&mut NoProgress)?;
//! println!("saved {}", report.path.display());
//!
//! // Sending side.
//! let mut log = |sent: u64, total: u64| eprintln!("{sent}/{total}");
//! let report = ferry::send("notes.txt", "10.0.0.2:9000", &Config::default(), &mut log)?;
//! println!("sent {} bytes", report.bytes);
//! # Ok::<(), ferry::Error>(())
//! ```

mod config;
mod error;
pub mod output;
mod progress;
mod receiver;
mod report;
mod sender;

pub use config::{Config, MAX_CHUNK_SIZE};
pub use error::{Error, Result};
pub use ferry_proto::{CHUNK_SIZE, FileHeader, HeaderFormat};
pub use progress::{NoProgress, Progress};
pub use receiver::{Receiver, receive};
pub use report::{Direction, Report};
pub use sender::send;
