//! Engine configuration: ports, intervals, and the partial-seeding opt-in.

use std::time::Duration;

/// Tunables for a single node. CLI flags always take precedence over values
/// loaded from a config file; this struct is the layer both feed into.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Path to the local catalog database.
    pub catalog_path: String,
    /// Port the RPC service binds to / is reached at.
    pub rpc_port: u16,
    /// Port discovery broadcasts use.
    pub discovery_port: u16,
    /// How often the transfer loop rebuilds fragment availability.
    pub scheduler_refresh_period: Duration,
    /// How often the background discovery task appends newly found peers.
    pub discovery_refresh_interval: Duration,
    /// Emit debug-level engine logs.
    pub verbose: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            catalog_path: "fileshare.db".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            discovery_port: fileshare_discovery::DEFAULT_DISCOVERY_PORT,
            scheduler_refresh_period: Duration::from_secs(5),
            discovery_refresh_interval: Duration::from_secs(3),
            verbose: false,
        }
    }
}

/// Default port the RPC service listens on.
pub const DEFAULT_RPC_PORT: u16 = 7711;
