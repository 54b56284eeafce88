//! Whole-file MD5 fingerprinting.

use md5::{Digest, Md5};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Read buffer size used while streaming a file through the hasher.
const READ_BUF: usize = 64 * 1024;

/// Stream `path` through MD5 and return the lowercase hex digest.
///
/// This never loads the whole file into memory; it is safe to call on
/// arbitrarily large files.
pub async fn fingerprint_file(path: impl AsRef<Path>) -> io::Result<String> {
    let mut file = File::open(path.as_ref()).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_BUF];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Hash an in-memory buffer. Used by tests and by small fixtures.
#[must_use]
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
