//! The capability contract a remote peer is addressed through.
//!
//! The scheduler and transfer loop depend only on [`PeerClient`] and
//! [`PeerResolver`]; the concrete RPC-backed implementation lives in
//! [`crate::adapter`] so this module stays transport-agnostic.

use async_trait::async_trait;
use fileshare_catalog::FileMetadata;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one fragment fetch.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Fragment that was requested.
    pub fragment_id: u32,
    /// Name of the peer it was requested from.
    pub peer_name: String,
    /// Fragment bytes, valid only when `ok` is true.
    pub bytes: Vec<u8>,
    /// Whether the fetch succeeded.
    pub ok: bool,
}

/// A live handle to one remote peer.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Stable name, unique within one request's registry.
    fn name(&self) -> &str;

    /// Files this peer currently advertises.
    async fn list(&self) -> Vec<FileMetadata>;

    /// Fragment ids this peer claims to hold for `fingerprint`. Never
    /// errors: a transport failure yields an empty list so the scheduler
    /// treats the peer as temporarily barren rather than evicting it.
    async fn fragments_available(&self, fingerprint: &str) -> Vec<u32>;

    /// Fetch one fragment. Returns `None` only when `cancel` fired before a
    /// result arrived; any other failure returns `Some` with `ok = false`.
    async fn download(
        &self,
        fingerprint: &str,
        fragment_id: u32,
        cancel: &CancellationToken,
    ) -> Option<DownloadResult>;

    /// Advisory liveness hint. Never authoritative.
    async fn alive(&self) -> bool;
}

/// Produces [`PeerClient`] handles, abstracting over how peers are found and
/// dialed (the "client factory" the discovery sweep hands results to).
#[async_trait]
pub trait PeerResolver: Send + Sync {
    /// Run one discovery sweep and return one client per unique peer found.
    async fn discover(&self) -> fileshare_discovery::Result<Vec<Arc<dyn PeerClient>>>;
}
