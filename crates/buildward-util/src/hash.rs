//! Checksums recorded for every exported report.
//!
//! CI artifact stores re-upload and re-download reports; the digest printed
//! at export time lets a reader confirm they are looking at the same bytes.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex_digest(Sha256::digest(data).as_slice())
}

/// Lowercase hex SHA-256 of the file at `path`, read incrementally.
///
/// # Errors
/// Returns `UtilError::Io` if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    let io_err = |source| UtilError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut reader = BufReader::with_capacity(64 * 1024, File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(io_err)?;
    Ok(hex_digest(hasher.finalize().as_slice()))
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
