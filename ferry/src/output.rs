//! Collision-free output path selection for the receiver.
//!
//! A declared name `report.pdf` lands as `report.pdf`, or as `report_1.pdf`,
//! `report_2.pdf`, ... when earlier candidates already exist.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Picks the first free candidate for `name` inside `dir`.
///
/// Scans suffixes `1..=max_suffix` linearly. Does not create the file; pair
/// with [`create_new`] so a racing writer fails the create instead of being
/// overwritten.
pub fn resolve(dir: &Path, name: &str, max_suffix: u32) -> io::Result<PathBuf> {
    let first = dir.join(name);
    if !exists(&first)? {
        return Ok(first);
    }
    for n in 1..=max_suffix {
        let candidate = dir.join(with_suffix(name, n));
        if !exists(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {name:?} after {max_suffix} attempts"),
    ))
}

/// Creates `path` for writing, failing if anything already exists there.
pub fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Inserts `_n` before the extension: `a.txt` → `a_1.txt`.
///
/// Names without an extension (including dotfiles such as `.profile`)
/// get the suffix appended.
fn with_suffix(name: &str, n: u32) -> OsString {
    let path = Path::new(name);
    let stem = path.file_stem().unwrap_or(path.as_os_str());
    let mut out = stem.to_os_string();
    out.push(format!("_{n}"));
    if let Some(ext) = path.extension() {
        out.push(".");
        out.push(ext);
    }
    out
}

/// Existence check that also counts dangling symlinks.
fn exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
