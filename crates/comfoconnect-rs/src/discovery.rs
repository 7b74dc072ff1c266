//! Bridge discovery over link-local UDP broadcast.
//!
//! The probe is broadcast on every non-loopback IPv4 interface's directed
//! broadcast address; a single global `255.255.255.255` probe is known to
//! miss bridges on multi-homed hosts. Replies are collected until the
//! timeout elapses and deduplicated by bridge uuid, since a bridge answers
//! once per interface that can reach it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{debug, info, warn};
use prost::Message;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::error::ComfoError;
use crate::proto::{SEARCH_PROBE, SearchGatewayResponse};
use crate::types::{C_BRIDGE_PORT, DeviceUuid};

/// A discovered bridge. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEndpoint {
    pub host: IpAddr,
    /// Session port; always [`C_BRIDGE_PORT`] on real bridges.
    pub port: u16,
    pub uuid: DeviceUuid,
    pub version: u32,
}

impl BridgeEndpoint {
    /// Endpoint for a bridge at a known address, e.g. from configuration
    /// instead of discovery.
    pub fn new(host: IpAddr, uuid: DeviceUuid) -> Self {
        BridgeEndpoint {
            host,
            port: C_BRIDGE_PORT,
            uuid,
            version: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// How long to collect replies.
    pub timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

/// Enumerates the directed broadcast address of every usable interface.
fn broadcast_targets() -> Result<Vec<Ipv4Addr>, ComfoError> {
    let mut targets = Vec::new();
    for interface in pnet::datalink::interfaces() {
        if interface.is_loopback() || !interface.is_up() {
            continue;
        }
        for network in &interface.ips {
            if let pnet::ipnetwork::IpNetwork::V4(v4) = network {
                targets.push(v4.broadcast());
            }
        }
    }
    targets.sort_unstable();
    targets.dedup();
    if targets.is_empty() {
        return Err(ComfoError::NoInterfaces);
    }
    Ok(targets)
}

/// Parses one discovery reply datagram. Returns `None` for our own probe
/// echo and for datagrams that do not validate.
fn parse_reply(data: &[u8], src: SocketAddr) -> Option<BridgeEndpoint> {
    if data == SEARCH_PROBE {
        return None;
    }
    let reply = SearchGatewayResponse::decode(data).ok()?;
    let uuid = DeviceUuid::from_slice(&reply.uuid)?;
    // Prefer the address the bridge reports about itself; a reply relayed
    // from an unexpected source is still accepted if its contents validate.
    let host = reply
        .ipaddress
        .parse::<IpAddr>()
        .unwrap_or_else(|_| src.ip());
    Some(BridgeEndpoint {
        host,
        port: C_BRIDGE_PORT,
        uuid,
        version: reply.version,
    })
}

async fn collect_replies(
    socket: &UdpSocket,
    window: Duration,
    stop_after_first: bool,
) -> Vec<BridgeEndpoint> {
    let deadline = Instant::now() + window;
    let mut bridges: Vec<BridgeEndpoint> = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let received = tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await;
        let (len, src) = match received {
            Ok(Ok(received)) => received,
            Ok(Err(err)) => {
                warn!("[DISCOVERY] Receive failed: {}", err);
                break;
            }
            Err(_) => break,
        };

        let Some(endpoint) = parse_reply(&buf[..len], src) else {
            continue;
        };
        if bridges.iter().any(|known| known.uuid == endpoint.uuid) {
            debug!("[DISCOVERY] Duplicate reply from {}", endpoint.uuid);
            continue;
        }
        info!(
            "[DISCOVERY] Bridge {} at {} (version {})",
            endpoint.uuid, endpoint.host, endpoint.version
        );
        bridges.push(endpoint);
        if stop_after_first {
            break;
        }
    }
    bridges
}

/// Probes every reachable network for bridges.
///
/// Returns the (possibly empty) list gathered when the timeout elapses.
pub async fn discover_bridges(
    options: &DiscoveryOptions,
) -> Result<Vec<BridgeEndpoint>, ComfoError> {
    let targets = broadcast_targets()?;
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, C_BRIDGE_PORT))
        .await
        .map_err(|_| ComfoError::SocketError)?;
    socket.set_broadcast(true).map_err(|_| ComfoError::SocketError)?;

    debug!("[DISCOVERY] Probing {} broadcast target(s)", targets.len());
    for target in &targets {
        if let Err(err) = socket
            .send_to(SEARCH_PROBE, (IpAddr::V4(*target), C_BRIDGE_PORT))
            .await
        {
            warn!("[DISCOVERY] Probe to {} failed: {}", target, err);
        }
    }

    Ok(collect_replies(&socket, options.timeout, false).await)
}

/// Probes a single known host with a unicast datagram.
pub async fn discover_bridge(
    host: IpAddr,
    timeout: Duration,
) -> Result<BridgeEndpoint, ComfoError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|_| ComfoError::SocketError)?;
    socket
        .send_to(SEARCH_PROBE, (host, C_BRIDGE_PORT))
        .await
        .map_err(|_| ComfoError::SocketError)?;

    collect_replies(&socket, timeout, true)
        .await
        .into_iter()
        .next()
        .ok_or(ComfoError::NotReachable)
}
