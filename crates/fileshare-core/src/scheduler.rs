//! Rarity-first, load-balanced fragment scheduler.
//!
//! On each call, rebuilds a per-fragment availability snapshot at most once
//! per [`refresh_period`](Scheduler::new), then scans from the rarest bucket
//! upward for the first not-yet-held fragment with at least one peer, and
//! within that fragment picks the least-loaded peer.

use crate::peer::PeerClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fragments grouped by how many currently-registered peers hold them,
/// keyed by that count (`k`). Groups preserve ascending fragment-id order,
/// so ties within a bucket are broken by fragment id.
type Availability = HashMap<usize, Vec<(u32, Vec<String>)>>;

/// Per-request scheduling state: availability cache and peer load counters.
/// Not reused across requests.
pub struct Scheduler {
    refresh_period: Duration,
    last_refresh: Option<Instant>,
    availability: Availability,
    request_count: HashMap<String, u32>,
    /// Stable order peers were first observed in, used to break ties in
    /// peer selection deterministically rather than by hash-map iteration.
    peer_order: Vec<String>,
}

impl Scheduler {
    /// A fresh scheduler that rebuilds availability every `refresh_period`.
    #[must_use]
    pub fn new(refresh_period: Duration) -> Self {
        Self {
            refresh_period,
            last_refresh: None,
            availability: HashMap::new(),
            request_count: HashMap::new(),
            peer_order: Vec::new(),
        }
    }

    fn due_for_refresh(&self) -> bool {
        match self.last_refresh {
            None => true,
            Some(t) => t.elapsed() >= self.refresh_period,
        }
    }

    async fn refresh(
        &mut self,
        peers: &HashMap<String, Arc<dyn PeerClient>>,
        fragment_count: u32,
        fingerprint: &str,
    ) {
        debug!(fingerprint, "scheduler refreshing availability");

        for name in peers.keys() {
            if !self.peer_order.contains(name) {
                self.peer_order.push(name.clone());
            }
        }

        let mut queries = Vec::with_capacity(self.peer_order.len());
        for name in &self.peer_order {
            if let Some(client) = peers.get(name) {
                let name = name.clone();
                let client = Arc::clone(client);
                let fingerprint = fingerprint.to_string();
                queries.push(async move {
                    let ids = client.fragments_available(&fingerprint).await;
                    (name, ids)
                });
            }
        }
        let results = futures::future::join_all(queries).await;

        let mut holders: Vec<Vec<String>> = vec![Vec::new(); fragment_count as usize];
        for (name, ids) in results {
            for id in ids {
                if let Some(bucket) = holders.get_mut(id as usize) {
                    bucket.push(name.clone());
                }
            }
        }

        let mut availability: Availability = HashMap::new();
        for (id, peer_names) in holders.into_iter().enumerate() {
            availability
                .entry(peer_names.len())
                .or_default()
                .push((id as u32, peer_names));
        }

        self.availability = availability;
        self.last_refresh = Some(Instant::now());
    }

    fn pick_peer<'a>(&mut self, candidates: &'a [String]) -> Option<&'a str> {
        let mut best: Option<(&str, u32)> = None;
        for name in candidates {
            let count = *self.request_count.get(name).unwrap_or(&0);
            match best {
                Some((_, best_count)) if count >= best_count => {}
                _ => best = Some((name.as_str(), count)),
            }
        }
        let (picked, count) = best?;
        self.request_count.insert(picked.to_string(), count + 1);
        Some(picked)
    }

    /// Select the next `(peer, fragment_id)` to fetch, or `None` when every
    /// fragment is either already held or held by no currently known peer.
    ///
    /// `peers` must be a snapshot taken while the caller briefly held the
    /// registry's read lock; this method itself performs the availability
    /// refresh's network I/O only after that lock has been released.
    pub async fn next_fragment(
        &mut self,
        peers: &HashMap<String, Arc<dyn PeerClient>>,
        held: &[u32],
        fragment_count: u32,
        fingerprint: &str,
    ) -> Option<(Arc<dyn PeerClient>, u32)> {
        if self.due_for_refresh() {
            self.refresh(peers, fragment_count, fingerprint).await;
        }

        for k in 0..=peers.len() {
            let Some(bucket) = self.availability.get(&k).cloned() else {
                continue;
            };
            for (fragment_id, candidates) in bucket {
                if held.contains(&fragment_id) || candidates.is_empty() {
                    continue;
                }
                let picked_name = self.pick_peer(&candidates)?.to_string();
                let client = peers.get(&picked_name)?;
                return Some((Arc::clone(client), fragment_id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::DownloadResult;
    use async_trait::async_trait;
    use fileshare_catalog::FileMetadata;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    struct StubPeer {
        name: String,
        fragments: Vec<u32>,
    }

    #[async_trait]
    impl PeerClient for StubPeer {
        fn name(&self) -> &str {
            &self.name
        }
        async fn list(&self) -> Vec<FileMetadata> {
            vec![]
        }
        async fn fragments_available(&self, _fingerprint: &str) -> Vec<u32> {
            self.fragments.clone()
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

    fn peer_map(peers: Vec<(&str, Vec<u32>)>) -> HashMap<String, Arc<dyn PeerClient>> {
        peers
            .into_iter()
            .map(|(name, fragments)| {
                (
                    name.to_string(),
                    Arc::new(StubPeer {
                        name: name.to_string(),
                        fragments,
                    }) as Arc<dyn PeerClient>,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn single_peer_sequential_order_then_none_available() {
        let peers = peer_map(vec![("p1", vec![0, 1])]);
        let mut scheduler = Scheduler::new(Duration::from_secs(60));
        let mut held = vec![];

        let (peer, id) = scheduler
            .next_fragment(&peers, &held, 2, "fp")
            .await
            .unwrap();
        assert_eq!(peer.name(), "p1");
        assert_eq!(id, 0);
        held.push(0);

        let (_, id) = scheduler
            .next_fragment(&peers, &held, 2, "fp")
            .await
            .unwrap();
        assert_eq!(id, 1);
        held.push(1);

        assert!(scheduler
            .next_fragment(&peers, &held, 2, "fp")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn single_peer_skips_missing_fragment() {
        let peers = peer_map(vec![("p1", vec![1])]);
        let mut scheduler = Scheduler::new(Duration::from_secs(60));
        let mut held = vec![];

        let (_, id) = scheduler
            .next_fragment(&peers, &held, 2, "fp")
            .await
            .unwrap();
        assert_eq!(id, 1);
        held.push(1);

        assert!(scheduler
            .next_fragment(&peers, &held, 2, "fp")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn two_peers_full_coverage_load_balances() {
        let peers = peer_map(vec![("a", vec![0, 1, 2, 3]), ("b", vec![0, 1, 2, 3])]);
        let mut scheduler = Scheduler::new(Duration::from_secs(60));
        let held = Mutex::new(Vec::<u32>::new());
        let mut picks: HashMap<String, u32> = HashMap::new();

        for _ in 0..4 {
            let snapshot = held.lock().unwrap().clone();
            let (peer, id) = scheduler
                .next_fragment(&peers, &snapshot, 4, "fp")
                .await
                .unwrap();
            *picks.entry(peer.name().to_string()).or_insert(0) += 1;
            held.lock().unwrap().push(id);
        }

        let a = *picks.get("a").unwrap_or(&0);
        let b = *picks.get("b").unwrap_or(&0);
        assert!((a as i32 - b as i32).abs() <= 1);
        assert_eq!(a + b, 4);
    }

    #[tokio::test]
    async fn rarity_first_with_asymmetric_coverage() {
        // peer A has everything; peer B only has 0 and 3, matching the
        // scenario in SPEC_FULL.md #8: expected fragment order 1, 2, 0, 3.
        let peers = peer_map(vec![("a", vec![0, 1, 2, 3]), ("b", vec![0, 3])]);
        let mut scheduler = Scheduler::new(Duration::from_secs(60));
        let mut held = vec![];
        let mut order = vec![];

        for _ in 0..4 {
            let (_, id) = scheduler
                .next_fragment(&peers, &held, 4, "fp")
                .await
                .unwrap();
            order.push(id);
            held.push(id);
        }

        assert_eq!(order, vec![1, 2, 0, 3]);
    }
}
