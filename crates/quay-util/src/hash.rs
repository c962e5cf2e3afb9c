//! SHA-256 digests for distribution artifacts.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Digest and size of a file, computed in a single streaming pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lower-case hex SHA-256.
    pub sha256: String,
    /// File length in bytes.
    pub size: u64,
}

impl FileDigest {
    /// The first `len` hex characters of the digest, for display.
    pub fn short(&self, len: usize) -> &str {
        self.sha256.get(..len).unwrap_or(&self.sha256)
    }
}

/// Hash a file with a 64 KiB read buffer, counting its bytes on the way.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> Result<FileDigest, UtilError> {
    let io_err = |source| UtilError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut reader = std::io::BufReader::new(std::fs::File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut size: u64 = 0;
    loop {
        let n = reader.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        let Some(chunk) = buf.get(..n) else {
            break;
        };
        hasher.update(chunk);
        size = size.saturating_add(u64::try_from(n).unwrap_or(u64::MAX));
    }

    Ok(FileDigest {
        sha256: format!("{:x}", hasher.finalize()),
        size,
    })
}

/// Compute only the SHA-256 hex digest of a file.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    digest_file(path).map(|d| d.sha256)
}
