use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// SHA-256 of a file's full byte stream, as a lowercase hex digest.
///
/// The file is read as opaque bytes — no text or newline transformation — so
/// digests are identical across platforms.
pub fn sha256_file_hex(path: &Path) -> Result<String, io::Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory byte slice, as a lowercase hex digest.
pub fn sha256_bytes_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
