use crate::{fsync_dir, FetchError};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

/// Size in bytes of a local dependency file.
///
/// The path must exist and be a regular file; anything else is fatal for the
/// compile.
pub fn local_file_size(path: &Path) -> Result<u64, FetchError> {
    let meta = fs::metadata(path).map_err(|_| FetchError::MissingLocalFile(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(FetchError::MissingLocalFile(path.to_path_buf()));
    }
    Ok(meta.len())
}

/// Stage a byte-for-byte copy of `src` at `dest`, never mutating the source.
///
/// The copy is written to a temp file next to `dest` and renamed into place,
/// so a failed copy never leaves a partial file behind. Returns the number of
/// bytes copied.
pub fn stage_copy(src: &Path, dest: &Path) -> Result<u64, FetchError> {
    let size = local_file_size(src)?;
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));

    let mut reader = File::open(src)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    let copied = io::copy(&mut reader, &mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| FetchError::Io(e.error))?;
    fsync_dir(dir)?;

    tracing::debug!("staged {} -> {} ({copied} bytes)", src.display(), dest.display());
    debug_assert_eq!(copied, size);
    Ok(copied)
}
