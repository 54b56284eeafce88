//! UDP broadcast discovery: a bounded sweep to find peers, and an advertise
//! loop to be found by them.

use crate::error::{DiscoveryError, Result};
use crate::payload::DiscoveryPayload;
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Discovery broadcasts run on this port, distinct from the RPC port nodes
/// exchange in their payload.
pub const DEFAULT_DISCOVERY_PORT: u16 = 7710;

/// Duration of a `discover()` sweep.
const SWEEP_DURATION: Duration = Duration::from_secs(2);

/// How often the sweep re-announces itself while listening.
const ANNOUNCE_INTERVAL: Duration = Duration::from_millis(250);

/// A peer found during discovery: its advertised name and RPC address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    /// Name the peer advertised.
    pub name: String,
    /// Socket address its RPC service is reachable at.
    pub addr: SocketAddr,
}

fn bind_broadcast_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::from(([0, 0, 0, 0], port)).into())?;
    UdpSocket::from_std(socket.into())
}

/// The subnet broadcast address of this host's first usable non-loopback
/// IPv4 interface, as reported by the OS. Falls back to the global limited
/// broadcast address (`255.255.255.255`) when no interface reports one —
/// no configured IPv4 interface, or only loopback.
fn subnet_broadcast_addr(discovery_port: u16) -> SocketAddr {
    let broadcast_ip = NetworkInterface::show()
        .ok()
        .into_iter()
        .flatten()
        .flat_map(|iface| iface.addr)
        .find_map(|addr| match addr {
            Addr::V4(v4) if !v4.ip.is_loopback() => v4.broadcast,
            _ => None,
        });

    match broadcast_ip {
        Some(ip) => SocketAddr::new(ip.into(), discovery_port),
        None => SocketAddr::from(([255, 255, 255, 255], discovery_port)),
    }
}

/// Perform a bounded (~2s) broadcast sweep, returning one entry per unique
/// peer name found, excluding `self_name`.
///
/// Fails with [`DiscoveryError::NoPeers`] when the sweep ends empty.
pub async fn discover(
    self_name: &str,
    rpc_addr: SocketAddr,
    discovery_port: u16,
) -> Result<Vec<DiscoveredPeer>> {
    let socket = bind_broadcast_socket(discovery_port)?;
    let payload = DiscoveryPayload {
        name: self_name.to_string(),
        address: rpc_addr.ip().to_string(),
        port: rpc_addr.port(),
    }
    .encode()
    .expect("DiscoveryPayload always serializes");

    let broadcast_addr = subnet_broadcast_addr(discovery_port);
    let mut found: HashMap<String, SocketAddr> = HashMap::new();
    let deadline = Instant::now() + SWEEP_DURATION;
    let mut announce = interval(ANNOUNCE_INTERVAL);
    let mut buf = vec![0u8; 1500];

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::select! {
            _ = announce.tick() => {
                if let Err(e) = socket.send_to(&payload, broadcast_addr).await {
                    warn!(error = %e, "discovery broadcast send failed");
                }
            }
            recv = timeout(deadline - now, socket.recv_from(&mut buf)) => {
                let Ok(Ok((n, from))) = recv else { continue };
                let Some(msg) = DiscoveryPayload::decode(&buf[..n]) else {
                    trace!(%from, "skipping malformed discovery payload");
                    continue;
                };
                if !msg.is_valid() || msg.name == self_name {
                    continue;
                }
                let Ok(ip) = msg.address.parse() else { continue };
                found.entry(msg.name.clone()).or_insert(SocketAddr::new(ip, msg.port));
            }
        }
    }

    if found.is_empty() {
        return Err(DiscoveryError::NoPeers);
    }

    debug!(count = found.len(), "discovery sweep complete");
    Ok(found
        .into_iter()
        .map(|(name, addr)| DiscoveredPeer { name, addr })
        .collect())
}

/// Advertise this node's presence until `cancel` fires.
pub async fn listen(
    self_name: &str,
    rpc_addr: SocketAddr,
    discovery_port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let socket = bind_broadcast_socket(discovery_port)?;
    let payload = DiscoveryPayload {
        name: self_name.to_string(),
        address: rpc_addr.ip().to_string(),
        port: rpc_addr.port(),
    }
    .encode()
    .expect("DiscoveryPayload always serializes");
    let broadcast_addr = subnet_broadcast_addr(discovery_port);
    let mut ticker = interval(ANNOUNCE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("discovery listen cancelled");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = socket.send_to(&payload, broadcast_addr).await {
                    warn!(error = %e, "discovery advertisement failed");
                }
            }
        }
    }
}
