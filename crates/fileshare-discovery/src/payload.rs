//! Wire format for discovery broadcasts.

use serde::{Deserialize, Serialize};

/// What a node broadcasts about itself on the discovery channel.
///
/// Encoded with `bincode` so the byte layout is stable across nodes
/// regardless of platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    /// Stable, operator-chosen node name.
    pub name: String,
    /// IP address the RPC service is reachable at.
    pub address: String,
    /// Port the RPC service listens on.
    pub port: u16,
}

impl DiscoveryPayload {
    /// A payload is malformed if it carries no name; such payloads are
    /// skipped by the receiver rather than treated as a peer.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// Serialize to the wire format sent over UDP.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Parse a received datagram. Returns `None` for anything that doesn't
    /// decode rather than erroring, since stray non-discovery traffic on the
    /// same port should not abort a sweep.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bincode::deserialize(bytes).ok()
    }
}
