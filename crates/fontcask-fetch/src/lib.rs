//! Content fetching and hashing for Fontcask.
//!
//! This crate resolves binary dependency references to readable local files:
//! `HttpFetcher` streams remote content into a scoped temporary directory,
//! `stage_copy` stages local files byte-for-byte with atomic writes, and
//! `sha256_file_hex` computes the content digest the compiled manifest records.

pub mod hash;
pub mod http;
pub mod local;

pub use hash::{sha256_bytes_hex, sha256_file_hex};
pub use http::{FetchedFile, HttpFetcher};
pub use local::{local_file_size, stage_copy};

use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Fsync a directory so a preceding `rename()` is durable on all filesystems.
pub fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to download '{url}': {reason}")]
    Http { url: Url, reason: String },
    #[error("local file '{0}' does not exist or is not a regular file")]
    MissingLocalFile(PathBuf),
}
