use crate::compiler::CompileOutput;
use crate::CompileError;
use fontcask_fetch::fsync_dir;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// File name of the compiled manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Populate the output directory from a finished compile.
///
/// The new tree is assembled in a sibling temp directory and renamed into
/// place, so a failure mid-copy leaves any previous build intact. Any
/// pre-existing output directory is replaced wholesale, so the directory
/// never mixes assets from different builds.
pub fn write_output(output: &CompileOutput, out_dir: &Path) -> Result<(), CompileError> {
    let parent = out_dir.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = TempDir::new_in(parent)?;

    let mut count = 0usize;
    for entry in fs::read_dir(output.staged_dir())? {
        let entry = entry?;
        fs::copy(entry.path(), staging.path().join(entry.file_name()))?;
        count += 1;
    }
    write_manifest(output, staging.path())?;

    // The previous build disappears only once the new tree is complete.
    if out_dir.exists() {
        tracing::debug!("replacing existing output directory {}", out_dir.display());
        fs::remove_dir_all(out_dir)?;
    }
    fs::rename(staging.into_path(), out_dir)?;
    fsync_dir(parent)?;

    tracing::info!(
        "wrote {} and {count} assets to {}",
        MANIFEST_FILE,
        out_dir.display()
    );
    Ok(())
}

/// Serialize the manifest with four-space indentation and a trailing newline,
/// then rename it into place.
fn write_manifest(output: &CompileOutput, out_dir: &Path) -> Result<(), CompileError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    output.manifest.serialize(&mut ser)?;
    buf.push(b'\n');

    let mut tmp = NamedTempFile::new_in(out_dir)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(out_dir.join(MANIFEST_FILE))
        .map_err(|e| CompileError::Io(e.error))?;
    Ok(())
}
