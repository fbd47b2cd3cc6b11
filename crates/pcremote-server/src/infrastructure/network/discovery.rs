//! UDP broadcast-based discovery responder.
//!
//! The host binds a UDP socket on the discovery port (default 9999) and
//! answers every datagram whose payload is exactly `PC_REMOTE_DISCOVERY` with
//! a unicast JSON reply to the sender:
//!
//! ```text
//! {"port":8000,"ips":["192.168.1.20"]}
//! ```
//!
//! Any other payload is ignored.
//!
//! # How UDP discovery works (for beginners)
//!
//! UDP (User Datagram Protocol) is a lightweight, connectionless networking
//! protocol.  Unlike TCP it does not guarantee delivery, ordering, or duplicate
//! prevention.  These trade-offs make it ideal for discovery broadcasts:
//!
//! 1. The phone sends a UDP packet to the LAN broadcast address (e.g.,
//!    `255.255.255.255`) on the discovery port.  Every device on the LAN
//!    receives this packet.
//!
//! 2. The host is listening on that port.  It checks the payload and sends a
//!    unicast reply back to the sender's address.
//!
//! 3. The phone reads the reply and now knows which IP and HTTP port to use
//!    for pairing.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──bind──► Listening ──beacon──► Responding ──► Listening
//!   ▲                │
//!   └── retry delay ◄┘ (bind failure / repeated socket errors)
//! ```
//!
//! [`run_discovery_responder`] is the supervisor: it binds, serves, and on
//! failure waits `retry_delay` before binding again.  Cancelling the shared
//! `CancellationToken` ends it from any state; the socket is dropped (closed)
//! on the way out.  No error escapes the task.

use std::net::SocketAddr;
use std::time::Duration;

use pcremote_core::discovery::{is_discovery_beacon, DiscoveryReply};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::interfaces::local_ipv4_addresses;

/// Largest datagram we bother reading.  The beacon is 19 bytes.
const RECV_BUFFER_BYTES: usize = 2048;

/// Consecutive receive errors after which the socket is considered broken
/// and rebound.
const MAX_CONSECUTIVE_RECV_ERRORS: u32 = 16;

/// Error type for discovery service operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The socket kept failing to receive.
    #[error("recv error: {0}")]
    Recv(std::io::Error),
}

/// Builds the reply for `payload`, or `None` if it is not a beacon.
pub fn reply_for(payload: &[u8], http_port: u16) -> Option<Vec<u8>> {
    if !is_discovery_beacon(payload) {
        return None;
    }
    match DiscoveryReply::new(http_port, local_ipv4_addresses()).to_bytes() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!(error = %e, "failed to encode discovery reply");
            None
        }
    }
}

/// Binds the discovery socket with broadcast enabled.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound.
pub async fn bind_discovery_socket(addr: SocketAddr) -> Result<UdpSocket, DiscoveryError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| DiscoveryError::BindFailed { addr, source })?;
    if let Err(e) = socket.set_broadcast(true) {
        warn!(error = %e, "could not enable SO_BROADCAST on discovery socket");
    }
    Ok(socket)
}

/// Answers beacons on `socket` until `cancel` fires.
///
/// Send failures and isolated receive failures are logged and skipped.
///
/// # Errors
///
/// Returns [`DiscoveryError::Recv`] after [`MAX_CONSECUTIVE_RECV_ERRORS`]
/// receive failures in a row, so the supervisor can rebind.
pub async fn serve_discovery(
    socket: UdpSocket,
    http_port: u16,
    cancel: CancellationToken,
) -> Result<(), DiscoveryError> {
    let mut buf = vec![0u8; RECV_BUFFER_BYTES];
    let mut consecutive_errors = 0u32;

    loop {
        let (len, src) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            received = socket.recv_from(&mut buf) => match received {
                Ok(pair) => {
                    consecutive_errors = 0;
                    pair
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(error = %e, consecutive_errors, "discovery recv error");
                    if consecutive_errors >= MAX_CONSECUTIVE_RECV_ERRORS {
                        return Err(DiscoveryError::Recv(e));
                    }
                    continue;
                }
            },
        };

        let Some(reply) = reply_for(&buf[..len], http_port) else {
            debug!(%src, len, "ignoring non-beacon datagram");
            continue;
        };

        match socket.send_to(&reply, src).await {
            Ok(_) => debug!(%src, "answered discovery beacon"),
            Err(e) => warn!(%src, error = %e, "failed to send discovery reply"),
        }
    }
}

/// Supervises the responder: bind, serve, and retry after `retry_delay` on
/// failure, until `cancel` fires.
pub async fn run_discovery_responder(
    addr: SocketAddr,
    http_port: u16,
    retry_delay: Duration,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        let outcome = match bind_discovery_socket(addr).await {
            Ok(socket) => {
                info!("discovery responder listening on UDP {addr}");
                serve_discovery(socket, http_port, cancel.clone()).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => break,
            Err(e) => error!(error = %e, retry_in = ?retry_delay, "discovery responder failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
    info!("discovery responder stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
