//! Serves this node's catalog to peers over `fileshare-rpc`.
//!
//! `remote_list` and `remote_download` share one visibility rule: a file is
//! visible once `Finished` regardless of `allow_partial`, and otherwise only
//! once `Seeding` unless the node opted into serving partial downloads.

use fileshare_catalog::{Catalog, Status};
use fileshare_files::FragmentReader;
use fileshare_rpc::{RpcHandler, WireMetaData};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Whether a file in `status` should be advertised/served, given this node's
/// `allow_partial` setting.
///
/// `Finished` (unpublished) is never visible. `Seeding` always is. Anything
/// else (`New`, `Paused`, `Downloading`) is visible only when this node opted
/// into serving partial downloads.
fn is_visible(status: Status, allow_partial: bool) -> bool {
    match status {
        Status::Finished => false,
        Status::Seeding => true,
        Status::New | Status::Paused | Status::Downloading => allow_partial,
    }
}

/// Serves `catalog` over RPC, gating visibility by `allow_partial`.
pub struct Seeder {
    catalog: Catalog,
    allow_partial: bool,
}

impl Seeder {
    /// Wrap a catalog for serving. `allow_partial` is fixed for the lifetime
    /// of this seeder, matching the original's "set once at seed time" rule.
    #[must_use]
    pub fn new(catalog: Catalog, allow_partial: bool) -> Self {
        Self {
            catalog,
            allow_partial,
        }
    }
}

#[async_trait]
impl RpcHandler for Seeder {
    async fn remote_list(&self) -> Vec<WireMetaData> {
        match self.catalog.list_local().await {
            Ok(files) => files
                .into_iter()
                .filter(|f| is_visible(f.status, self.allow_partial))
                .map(|f| WireMetaData::from(&f))
                .collect(),
            Err(e) => {
                warn!(error = %e, "remote_list: catalog read failed");
                Vec::new()
            }
        }
    }

    async fn remote_fragments_available(&self, fingerprint: &str) -> Vec<i32> {
        match self.catalog.find_by_fingerprint(fingerprint).await {
            Ok(Some(meta)) => meta.held_fragments.into_iter().map(|id| id as i32).collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(fingerprint, error = %e, "remote_fragments_available: catalog read failed");
                Vec::new()
            }
        }
    }

    async fn remote_download(
        &self,
        fingerprint: &str,
        fragment_id: u32,
    ) -> Result<Vec<u8>, String> {
        let meta = self
            .catalog
            .find_by_fingerprint(fingerprint)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("unknown fingerprint {fingerprint}"))?;

        if !is_visible(meta.status, self.allow_partial) {
            return Err(format!("{fingerprint} is not currently shared"));
        }
        if !meta.has_fragment(fragment_id) {
            return Err(format!("fragment {fragment_id} not held"));
        }

        debug!(fingerprint, fragment_id, "serving fragment");
        let mut reader = FragmentReader::open(&meta.file_path, meta.size)
            .await
            .map_err(|e| e.to_string())?;
        reader.read_fragment(fragment_id).await.map_err(|e| e.to_string())
    }
}
