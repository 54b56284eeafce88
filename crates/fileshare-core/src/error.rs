//! Error taxonomy for the transfer engine.
//!
//! Errors are categorized so the transfer loop can tell a recoverable,
//! per-fragment hiccup from a failure that should end the whole download.

use std::borrow::Cow;
use thiserror::Error;

/// Errors surfaced by the scheduler, transfer loop, and seeder.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    // ============ Catalog errors ============
    /// The catalog could not be opened.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(Cow<'static, str>),

    // ============ Local file errors ============
    /// A publish target does not exist on disk.
    #[error("file not found: {0}")]
    FileNotFound(String),

    // ============ Discovery / peer errors ============
    /// A discovery sweep found no peers when at least one was required.
    #[error("no peers found on the local network")]
    NoPeers,

    /// The target fingerprint is neither held locally nor advertised by any
    /// discovered peer.
    #[error("metadata missing for fingerprint {0}")]
    MetadataMissing(String),

    /// A single fragment fetch failed. Never fatal; the transfer loop simply
    /// re-invokes the scheduler.
    #[error("fragment {fragment_id} fetch from {peer} failed")]
    FragmentFetchFailed {
        /// Peer the fragment was requested from.
        peer: String,
        /// Fragment id that failed.
        fragment_id: u32,
    },

    /// Listing a peer's files or fragments failed. The peer is not evicted
    /// from the registry; it may recover on the next query.
    #[error("peer {0} listing failed")]
    PeerListFailed(String),

    // ============ Transfer-loop errors ============
    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The scheduler found no eligible fragment while the file remains
    /// incomplete.
    #[error("transfer stalled: no peer currently has a missing fragment")]
    Stalled,

    /// Writing a fragment to disk failed.
    #[error("write to disk failed: {0}")]
    IoWriteFailed(String),

    /// Generic I/O passthrough.
    #[error("io error: {0}")]
    Io(Cow<'static, str>),
}

impl EngineError {
    /// True for failures that are expected in the normal course of a
    /// download (peer churn, transient network hiccups) and never abort the
    /// whole transfer.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::FragmentFetchFailed { .. } | EngineError::PeerListFailed(_)
        )
    }

    /// Build a discovery-exhausted error.
    #[must_use]
    pub const fn no_peers() -> Self {
        EngineError::NoPeers
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(Cow::Owned(err.to_string()))
    }
}

impl From<fileshare_catalog::CatalogError> for EngineError {
    fn from(err: fileshare_catalog::CatalogError) -> Self {
        EngineError::CatalogUnavailable(Cow::Owned(err.to_string()))
    }
}

impl From<fileshare_discovery::DiscoveryError> for EngineError {
    fn from(err: fileshare_discovery::DiscoveryError) -> Self {
        match err {
            fileshare_discovery::DiscoveryError::NoPeers => EngineError::NoPeers,
            other => EngineError::Io(Cow::Owned(other.to_string())),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
