//! Error types for the wire transport.

use thiserror::Error;

/// Errors surfaced by the RPC client and server.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The fingerprint named in the request is unknown to this node.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The file exists but its current status does not permit this request
    /// (e.g. `Finished`, or `Paused`/`Downloading` without partial seeding).
    #[error("file not available: {0}")]
    NotAvailable(String),

    /// The requested fragment id is out of range for the file.
    #[error("fragment {fragment_id} out of range for {fingerprint} ({fragment_count} fragments)")]
    FragmentOutOfRange {
        /// Fingerprint of the file.
        fingerprint: String,
        /// Fragment id requested.
        fragment_id: u32,
        /// Total number of fragments the file has.
        fragment_count: u32,
    },

    /// Reading the fragment's bytes off disk failed.
    #[error("local read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The connection to the peer failed or was refused.
    #[error("connection failed: {0}")]
    Connection(std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] Box<bincode::ErrorKind>),

    /// The peer closed the connection before a full frame arrived.
    #[error("peer closed connection unexpectedly")]
    UnexpectedEof,
}

/// Result type for RPC operations.
pub type Result<T> = std::result::Result<T, RpcError>;
