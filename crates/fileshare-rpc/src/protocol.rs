//! Wire types and framing for the fileshare peer service.
//!
//! Every call is one request frame followed by one response frame: a 4-byte
//! big-endian length header followed by a `bincode`-encoded payload. One TCP
//! connection serves exactly one call, mirroring the original's
//! dial-per-call transport without paying for a full RPC framework this
//! protocol doesn't need (no streaming, no multiplexing).

use crate::error::{RpcError, Result};
use fileshare_catalog::{FileMetadata, Status};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame this protocol will read, guarding against a malformed length
/// header driving an unbounded allocation. Generous enough for a metadata
/// listing of several thousand files or one full fragment payload.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// On-wire representation of [`FileMetadata`]. Sizes are fixed-width so the
/// layout doesn't depend on the host's native integer width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMetaData {
    /// Display name.
    pub name: String,
    /// Publishing node's name.
    pub publisher: String,
    /// Content fingerprint, lowercase hex MD5.
    pub fingerprint: String,
    /// Total size in bytes.
    pub size: i64,
    /// Total fragment count.
    pub fragment_count: i32,
    /// Ids of fragments the peer currently holds.
    pub held_fragments: Vec<i32>,
    /// Lifecycle status, encoded the same way the catalog stores it.
    pub status: u8,
}

impl From<&FileMetadata> for WireMetaData {
    fn from(m: &FileMetadata) -> Self {
        WireMetaData {
            name: m.name.clone(),
            publisher: m.publisher.clone(),
            fingerprint: m.fingerprint.clone(),
            size: m.size as i64,
            fragment_count: m.fragment_count as i32,
            held_fragments: m.held_fragments.iter().map(|&id| id as i32).collect(),
            status: m.status.as_i64() as u8,
        }
    }
}

impl WireMetaData {
    /// Reconstruct a [`FileMetadata`], tagging it with the peer's own address
    /// as `file_path` is meaningless off the wire; callers that resume a
    /// download fill in a real destination path themselves.
    #[must_use]
    pub fn into_metadata(self, file_path: String) -> FileMetadata {
        FileMetadata {
            name: self.name,
            file_path,
            publisher: self.publisher,
            fingerprint: self.fingerprint,
            size: self.size as u64,
            fragment_count: self.fragment_count as u32,
            held_fragments: self.held_fragments.into_iter().map(|id| id as u32).collect(),
            status: Status::from_i64(i64::from(self.status)).unwrap_or(Status::New),
        }
    }
}

/// The three methods of the file service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// List files this peer will advertise. Whether `Downloading`/`Paused`
    /// files are included alongside `Seeding` ones is the server's own
    /// `allow_partial` setting, not a client-supplied parameter.
    List,
    /// Fragment ids held for a given fingerprint.
    FragmentsAvailable {
        /// Target fingerprint.
        fingerprint: String,
    },
    /// Fetch one fragment's bytes.
    Download {
        /// Target fingerprint.
        fingerprint: String,
        /// Fragment index.
        fragment_id: u32,
    },
}

/// The response to one [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    /// Reply to [`Request::List`].
    List(Vec<WireMetaData>),
    /// Reply to [`Request::FragmentsAvailable`].
    FragmentsAvailable(Vec<i32>),
    /// Successful reply to [`Request::Download`].
    Download {
        /// Fragment index echoed back.
        fragment_id: u32,
        /// Fragment bytes.
        data: Vec<u8>,
    },
    /// Any request that the server could not satisfy.
    Error(String),
}

/// Write one length-prefixed, `bincode`-encoded frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(value)?;
    let len = u32::try_from(payload.len()).map_err(|_| RpcError::UnexpectedEof)?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed, `bincode`-encoded frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(RpcError::Protocol(Box::new(
            bincode::ErrorKind::SizeLimit,
        )));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(bincode::deserialize(&buf)?)
}
