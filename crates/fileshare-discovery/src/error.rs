//! Error types for discovery operations.

use thiserror::Error;

/// Errors surfaced by [`crate::discover`] and [`crate::listen`].
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No peers answered within the sweep window.
    #[error("no peers found on the local network")]
    NoPeers,

    /// Binding or using the broadcast socket failed.
    #[error("discovery transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
