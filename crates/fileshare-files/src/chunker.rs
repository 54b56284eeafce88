//! Fixed-size fragment reader/writer.
//!
//! Fragment `i` of a file occupies bytes `[i * CHUNK_SIZE, min((i+1) * CHUNK_SIZE, size))`.
//! Every fragment is `CHUNK_SIZE` bytes except possibly the last, which may be shorter.

use std::io;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};

/// Size of a single fragment, in bytes.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

/// Number of fragments required to hold `size` bytes.
#[must_use]
pub fn fragment_count(size: u64) -> u32 {
    size.div_ceil(CHUNK_SIZE) as u32
}

/// Byte range `[start, end)` occupied by fragment `id` of a file of the given `size`.
#[must_use]
pub fn fragment_range(id: u32, size: u64) -> (u64, u64) {
    let start = u64::from(id) * CHUNK_SIZE;
    let end = (start + CHUNK_SIZE).min(size);
    (start, end)
}

/// Reads individual fragments out of a local, fully-held file (the seeder's view).
pub struct FragmentReader {
    file: File,
    size: u64,
}

impl FragmentReader {
    /// Open `path` for fragment reads. `size` is the file's advertised total size.
    pub async fn open(path: impl AsRef<Path>, size: u64) -> io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self { file, size })
    }

    /// Read fragment `id`'s bytes. Short reads are only valid at the final fragment.
    pub async fn read_fragment(&mut self, id: u32) -> io::Result<Vec<u8>> {
        let (start, end) = fragment_range(id, self.size);
        let len = (end - start) as usize;
        self.file.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

/// Writes fragments into a destination file pre-truncated to its final size, so
/// writes are positional and idempotent regardless of arrival order.
pub struct FragmentWriter {
    file: File,
    size: u64,
}

impl FragmentWriter {
    /// Create (or truncate) `path` to exactly `size` bytes and prepare it for
    /// out-of-order fragment writes.
    pub async fn create(path: impl AsRef<Path>, size: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;
        file.set_len(size).await?;
        Ok(Self { file, size })
    }

    /// Write fragment `id`'s bytes at its positional offset.
    pub async fn write_fragment(&mut self, id: u32, data: &[u8]) -> io::Result<()> {
        let (start, end) = fragment_range(id, self.size);
        debug_assert_eq!(data.len() as u64, end - start);
        self.file.seek(SeekFrom::Start(start)).await?;
        self.file.write_all(data).await?;
        Ok(())
    }

    /// Flush buffered writes to disk.
    pub async fn sync(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_data().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_count_matches_ceil_division() {
        assert_eq!(fragment_count(0), 0);
        assert_eq!(fragment_count(1), 1);
        assert_eq!(fragment_count(CHUNK_SIZE), 1);
        assert_eq!(fragment_count(CHUNK_SIZE + 1), 2);
    }

    #[test]
    fn fragment_range_last_is_short() {
        let size = CHUNK_SIZE + 100;
        assert_eq!(fragment_range(0, size), (0, CHUNK_SIZE));
        assert_eq!(fragment_range(1, size), (CHUNK_SIZE, size));
    }

    #[tokio::test]
    async fn out_of_order_writes_reassemble_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let size = CHUNK_SIZE * 2 + 10;

        let frag0 = vec![1u8; CHUNK_SIZE as usize];
        let frag1 = vec![2u8; CHUNK_SIZE as usize];
        let frag2 = vec![3u8; 10];

        let mut writer = FragmentWriter::create(&path, size).await.unwrap();
        writer.write_fragment(2, &frag2).await.unwrap();
        writer.write_fragment(0, &frag0).await.unwrap();
        writer.write_fragment(1, &frag1).await.unwrap();
        writer.sync().await.unwrap();

        let mut reader = FragmentReader::open(&path, size).await.unwrap();
        assert_eq!(reader.read_fragment(0).await.unwrap(), frag0);
        assert_eq!(reader.read_fragment(1).await.unwrap(), frag1);
        assert_eq!(reader.read_fragment(2).await.unwrap(), frag2);
    }

    #[tokio::test]
    async fn create_pre_truncates_to_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trunc.bin");
        let size = CHUNK_SIZE + 42;

        let _writer = FragmentWriter::create(&path, size).await.unwrap();
        let meta = tokio::fs::metadata(&path).await.unwrap();
        assert_eq!(meta.len(), size);
    }
}
