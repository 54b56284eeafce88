//! The download driver: resolve metadata, sweep for peers, then loop the
//! scheduler against the registry until the file is complete, stalled, or
//! cancelled.

use crate::config::NodeConfig;
use crate::error::{EngineError, Result};
use crate::peer::{PeerClient, PeerResolver};
use crate::progress::ProgressSink;
use crate::registry::PeerRegistry;
use crate::scheduler::Scheduler;
use fileshare_catalog::{Catalog, FileMetadata, Status};
use fileshare_files::FragmentWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolve the metadata a download should proceed against: resume a file
/// already known locally (whatever its status), or fall back to whatever a
/// peer is currently advertising for `fingerprint_or_name`.
///
/// A fresh match from a peer's listing is the *peer's* view of the file —
/// its own `held_fragments`, `status`, and `file_path` — none of which apply
/// to this node. Per SPEC_FULL.md §4.5 step 1, it must be cloned with empty
/// `held_fragments`, `file_path = download_dir + name`, and
/// `status = Downloading` before it is persisted and used locally, matching
/// `original_source/p2p/request.go`'s `getFileMeta()`
/// (`m.FilePath = path.Join(r.dlDirectory, m.Name)`).
async fn resolve_metadata(
    catalog: &Catalog,
    resolver: &Arc<dyn PeerResolver>,
    fingerprint_or_name: &str,
    download_dir: &str,
) -> Result<FileMetadata> {
    if let Some(meta) = catalog.find_by_fingerprint(fingerprint_or_name).await? {
        return Ok(meta);
    }
    if let Some(meta) = catalog.find_by_name(fingerprint_or_name).await? {
        return Ok(meta);
    }

    let peers = resolver.discover().await?;
    for peer in &peers {
        for meta in peer.list().await {
            if meta.fingerprint == fingerprint_or_name || meta.name == fingerprint_or_name {
                let file_path = Path::new(download_dir)
                    .join(&meta.name)
                    .to_string_lossy()
                    .into_owned();
                let local = FileMetadata {
                    held_fragments: vec![],
                    file_path,
                    status: Status::Downloading,
                    ..meta
                };
                catalog.insert_remote(&local).await?;
                return Ok(local);
            }
        }
    }
    Err(EngineError::MetadataMissing(fingerprint_or_name.to_string()))
}

/// Drive one file's download to completion, pause, or failure.
///
/// `download_dir` is the directory fragments are written into; the
/// destination file name is the resolved metadata's own `name`, not
/// `fingerprint_or_name` as passed by the caller. On a resume, the
/// previously-persisted `file_path` is reused regardless of `download_dir`.
pub async fn download(
    catalog: &Catalog,
    resolver: Arc<dyn PeerResolver>,
    config: &NodeConfig,
    fingerprint_or_name: &str,
    download_dir: &str,
    progress: &dyn ProgressSink,
    cancel: CancellationToken,
) -> Result<()> {
    let meta = resolve_metadata(catalog, &resolver, fingerprint_or_name, download_dir).await?;
    let fingerprint = meta.fingerprint.clone();
    let dest_path = meta.file_path.clone();

    if meta.is_complete() {
        info!(%fingerprint, "already fully held, nothing to do");
        progress.on_finished("already complete");
        return Ok(());
    }

    let mut writer = FragmentWriter::create(&dest_path, meta.size).await?;
    catalog.save_status(&fingerprint, Status::Downloading).await?;

    let registry = Arc::new(PeerRegistry::new());
    let initial = resolver.discover().await?;
    if initial.is_empty() {
        // Unlike `stalled`, no-peers exits without touching status: it leaves
        // whatever was just persisted above (`Downloading`) rather than
        // flipping to `Paused`.
        return Err(EngineError::no_peers());
    }
    registry.extend(initial).await;

    let background = spawn_discovery_refresh(
        Arc::clone(&registry),
        Arc::clone(&resolver),
        config.discovery_refresh_interval,
        cancel.clone(),
    );

    let mut scheduler = Scheduler::new(config.scheduler_refresh_period);
    let mut held = meta.held_fragments.clone();
    let total_bytes = meta.size;
    let mut bytes_done = held
        .iter()
        .map(|id| fileshare_files::fragment_range(*id, total_bytes))
        .map(|(start, end)| end - start)
        .sum::<u64>();

    let outcome = loop {
        if cancel.is_cancelled() {
            break Err(EngineError::Cancelled);
        }

        let snapshot = {
            let guard = registry.read().await;
            guard.clone()
        };

        let Some((peer, fragment_id)) = scheduler
            .next_fragment(&snapshot, &held, meta.fragment_count, &fingerprint)
            .await
        else {
            break Err(EngineError::Stalled);
        };

        match peer.download(&fingerprint, fragment_id, &cancel).await {
            Some(result) if result.ok => {
                if let Err(e) = writer.write_fragment(fragment_id, &result.bytes).await {
                    break Err(EngineError::IoWriteFailed(e.to_string()));
                }
                catalog.record_fragment(&fingerprint, fragment_id).await?;
                held.push(fragment_id);
                bytes_done += result.bytes.len() as u64;
                progress.on_fragment_complete(bytes_done, total_bytes);

                if held.len() as u32 == meta.fragment_count {
                    break Ok(());
                }
            }
            Some(_) => {
                warn!(peer = peer.name(), fragment_id, "fragment fetch failed, retrying");
            }
            None => {
                break Err(EngineError::Cancelled);
            }
        }
    };

    background.abort();
    writer.sync().await?;

    match outcome {
        Ok(()) => {
            catalog.save_status(&fingerprint, Status::Seeding).await?;
            info!(%fingerprint, "download complete");
            progress.on_finished("complete");
            Ok(())
        }
        Err(EngineError::Cancelled) => {
            catalog.save_status(&fingerprint, Status::Paused).await?;
            progress.on_finished("paused");
            Ok(())
        }
        Err(e) => {
            catalog.save_status(&fingerprint, Status::Paused).await?;
            progress.on_finished(&e.to_string());
            Err(e)
        }
    }
}

fn spawn_discovery_refresh(
    registry: Arc<PeerRegistry>,
    resolver: Arc<dyn PeerResolver>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    match resolver.discover().await {
                        Ok(found) => registry.extend(found).await,
                        Err(e) => warn!(error = %e, "background discovery sweep failed"),
                    }
                }
            }
        }
    })
}
