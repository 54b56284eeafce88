//! # fileshare-discovery
//!
//! LAN peer discovery over UDP broadcast: a bounded sweep ([`discover`]) to
//! find currently-advertising peers, and an advertise loop ([`listen`]) so
//! this node can be found by others.

pub mod broadcast;
pub mod error;
pub mod payload;

pub use broadcast::{discover, listen, DiscoveredPeer, DEFAULT_DISCOVERY_PORT};
pub use error::{DiscoveryError, Result};
pub use payload::DiscoveryPayload;
