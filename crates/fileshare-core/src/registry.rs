//! The peer registry: an insertion-only map from peer name to live client.
//!
//! Owned by one transfer request. The background discovery task is the only
//! writer; the transfer loop and scheduler only ever read it, and must not
//! perform I/O while holding the read guard.

use crate::peer::PeerClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

/// Peers discovered so far within one request. Entries are appended as
/// discovery finds new peers and are never removed, even if a peer later
/// fails to respond — a failing peer simply contributes empty results.
#[derive(Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Arc<dyn PeerClient>>>,
}

impl PeerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any peers not already known by name.
    pub async fn extend(&self, found: Vec<Arc<dyn PeerClient>>) {
        let mut guard = self.peers.write().await;
        for peer in found {
            guard.entry(peer.name().to_string()).or_insert_with(|| {
                debug!(peer = peer.name(), "registered new peer");
                peer
            });
        }
    }

    /// Take a read lock for the scheduler to consult. Callers must not do
    /// I/O while holding the guard.
    pub async fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn PeerClient>>> {
        self.peers.read().await
    }

    /// Number of peers currently known.
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// True when no peers have been registered yet.
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::DownloadResult;
    use async_trait::async_trait;
    use fileshare_catalog::FileMetadata;
    use tokio_util::sync::CancellationToken;

    struct StubPeer(&'static str);

    #[async_trait]
    impl PeerClient for StubPeer {
        fn name(&self) -> &str {
            self.0
        }
        async fn list(&self) -> Vec<FileMetadata> {
            vec![]
        }
        async fn fragments_available(&self, _fingerprint: &str) -> Vec<u32> {
            vec![]
        }
        async fn download(
            &self,
            _fingerprint: &str,
            _fragment_id: u32,
            _cancel: &CancellationToken,
        ) -> Option<DownloadResult> {
            None
        }
        async fn alive(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn extend_is_insertion_only() {
        let registry = PeerRegistry::new();
        registry
            .extend(vec![Arc::new(StubPeer("a")) as Arc<dyn PeerClient>])
            .await;
        assert_eq!(registry.len().await, 1);

        // re-adding the same name and a new one: only the new one grows the set
        registry
            .extend(vec![
                Arc::new(StubPeer("a")) as Arc<dyn PeerClient>,
                Arc::new(StubPeer("b")) as Arc<dyn PeerClient>,
            ])
            .await;
        assert_eq!(registry.len().await, 2);
    }
}
