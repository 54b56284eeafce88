//! Cancelling mid-transfer pauses with exactly the fragments fetched so far
//! persisted; a second call against the same catalog and destination path
//! resumes and completes the rest.

use async_trait::async_trait;
use fileshare_catalog::FileMetadata;
use fileshare_core::{DownloadResult, NodeConfig, NullProgress, PeerClient, PeerResolver, RpcPeerClient};
use fileshare_integration_tests::SeederNode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Wraps a peer client and cancels `cancel` the moment a fragment fetch
/// succeeds, so the transfer loop stops after exactly one fragment.
struct CancelAfterFirstSuccess {
    inner: Arc<dyn PeerClient>,
    cancel: CancellationToken,
}

#[async_trait]
impl PeerClient for CancelAfterFirstSuccess {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list(&self) -> Vec<FileMetadata> {
        self.inner.list().await
    }

    async fn fragments_available(&self, fingerprint: &str) -> Vec<u32> {
        self.inner.fragments_available(fingerprint).await
    }

    async fn download(
        &self,
        fingerprint: &str,
        fragment_id: u32,
        cancel: &CancellationToken,
    ) -> Option<DownloadResult> {
        let result = self.inner.download(fingerprint, fragment_id, cancel).await;
        if let Some(ref r) = result {
            if r.ok {
                self.cancel.cancel();
            }
        }
        result
    }

    async fn alive(&self) -> bool {
        self.inner.alive().await
    }
}

struct OneClientResolver(Arc<dyn PeerClient>);

#[async_trait]
impl PeerResolver for OneClientResolver {
    async fn discover(&self) -> fileshare_discovery::Result<Vec<Arc<dyn PeerClient>>> {
        Ok(vec![self.0.clone()])
    }
}

#[tokio::test]
async fn cancelling_mid_transfer_pauses_then_resumes_to_completion() {
    let seed_dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..5 * 1024 * 1024).map(|i| (i % 199) as u8).collect();
    let source_path = seed_dir.path().join("big.bin");
    tokio::fs::write(&source_path, &data).await.unwrap();

    let seeder_catalog = fileshare_catalog::Catalog::open_in_memory().await.unwrap();
    seeder_catalog
        .publish(source_path.to_str().unwrap(), "seeder")
        .await
        .unwrap();
    let seeder = SeederNode::start_with_catalog(seeder_catalog, false).await;

    let dl_dir = tempfile::tempdir().unwrap();
    let downloader_catalog = fileshare_catalog::Catalog::open_in_memory().await.unwrap();
    let fingerprint = fileshare_files::fingerprint_bytes(&data);

    let cancel = CancellationToken::new();
    let raw_client: Arc<dyn PeerClient> = Arc::new(RpcPeerClient::new("seeder".to_string(), seeder.addr));
    let wrapped: Arc<dyn PeerClient> = Arc::new(CancelAfterFirstSuccess {
        inner: raw_client,
        cancel: cancel.clone(),
    });
    let resolver: Arc<dyn PeerResolver> = Arc::new(OneClientResolver(wrapped));

    fileshare_core::download(
        &downloader_catalog,
        resolver,
        &NodeConfig::default(),
        &fingerprint,
        dl_dir.path().to_str().unwrap(),
        &NullProgress,
        cancel,
    )
    .await
    .unwrap();

    let paused = downloader_catalog
        .find_by_fingerprint(&fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paused.status, fileshare_catalog::Status::Paused);
    assert_eq!(paused.held_fragments.len(), 1);
    assert!(paused.held_fragments.len() < paused.fragment_count as usize);

    fileshare_core::download(
        &downloader_catalog,
        seeder.resolver(),
        &NodeConfig::default(),
        &fingerprint,
        dl_dir.path().to_str().unwrap(),
        &NullProgress,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let dest = dl_dir.path().join("big.bin");
    let on_disk = tokio::fs::read(&dest).await.unwrap();
    assert_eq!(on_disk, data);

    let finished = downloader_catalog
        .find_by_fingerprint(&fingerprint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished.status, fileshare_catalog::Status::Seeding);
    assert_eq!(
        finished.held_fragments.len(),
        finished.fragment_count as usize
    );

    seeder.shutdown().await;
}
