//! RPC-backed implementation of [`PeerClient`] / [`PeerResolver`].
//!
//! This is the "client factory" the discovery sweep hands its results to:
//! each discovered address becomes one [`RpcPeerClient`], dialed fresh per
//! call by [`fileshare_rpc::RpcClient`].

use crate::peer::{DownloadResult, PeerClient, PeerResolver};
use async_trait::async_trait;
use fileshare_catalog::FileMetadata;
use fileshare_rpc::RpcClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A peer reached over TCP via `fileshare-rpc`.
pub struct RpcPeerClient {
    name: String,
    client: RpcClient,
}

impl RpcPeerClient {
    /// Wrap a discovered `(name, address)` pair as a client handle.
    #[must_use]
    pub fn new(name: String, addr: SocketAddr) -> Self {
        Self {
            name,
            client: RpcClient::new(addr),
        }
    }
}

#[async_trait]
impl PeerClient for RpcPeerClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Vec<FileMetadata> {
        match self.client.list().await {
            Ok(files) => files
                .into_iter()
                .map(|w| {
                    let path = w.name.clone();
                    w.into_metadata(path)
                })
                .collect(),
            Err(e) => {
                warn!(peer = %self.name, error = %e, "remote_list failed");
                Vec::new()
            }
        }
    }

    async fn fragments_available(&self, fingerprint: &str) -> Vec<u32> {
        match self.client.fragments_available(fingerprint).await {
            Ok(ids) => ids.into_iter().map(|id| id as u32).collect(),
            Err(e) => {
                debug!(peer = %self.name, error = %e, "fragments_available failed");
                Vec::new()
            }
        }
    }

    async fn download(
        &self,
        fingerprint: &str,
        fragment_id: u32,
        cancel: &CancellationToken,
    ) -> Option<DownloadResult> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.client.download(fingerprint, fragment_id) => {
                match result {
                    Ok(bytes) => Some(DownloadResult {
                        fragment_id,
                        peer_name: self.name.clone(),
                        bytes,
                        ok: true,
                    }),
                    Err(e) => {
                        debug!(peer = %self.name, fragment_id, error = %e, "download failed");
                        Some(DownloadResult {
                            fragment_id,
                            peer_name: self.name.clone(),
                            bytes: Vec::new(),
                            ok: false,
                        })
                    }
                }
            }
        }
    }

    async fn alive(&self) -> bool {
        self.client.fragments_available("__alive_probe__").await.is_ok()
    }
}

/// Discovers peers over LAN broadcast and wraps each as an [`RpcPeerClient`].
pub struct RpcPeerResolver {
    self_name: String,
    rpc_addr: SocketAddr,
    discovery_port: u16,
}

impl RpcPeerResolver {
    /// Build a resolver that excludes `self_name` from its own sweeps and
    /// advertises `rpc_addr` as where this node's RPC service is reachable.
    #[must_use]
    pub fn new(self_name: String, rpc_addr: SocketAddr, discovery_port: u16) -> Self {
        Self {
            self_name,
            rpc_addr,
            discovery_port,
        }
    }
}

#[async_trait]
impl PeerResolver for RpcPeerResolver {
    async fn discover(&self) -> fileshare_discovery::Result<Vec<Arc<dyn PeerClient>>> {
        let found = fileshare_discovery::discover(&self.self_name, self.rpc_addr, self.discovery_port).await?;
        Ok(found
            .into_iter()
            .map(|peer| Arc::new(RpcPeerClient::new(peer.name, peer.addr)) as Arc<dyn PeerClient>)
            .collect())
    }
}
