//! Wire protocol shared by the ferry sender and receiver.
//!
//! A session is a single header followed by exactly `size` raw body bytes,
//! suitable for any reliable byte stream (TCP, Unix socket). The body has
//! no terminator: the receiver stops once it has consumed `size` bytes.

mod header;
pub mod progress;

pub use header::{FileHeader, HeaderFormat, MAX_NAME_LEN, decode, encode, validate_name};

/// Default upper bound for one chunk of body data (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;
