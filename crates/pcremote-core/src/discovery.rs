//! Discovery wire format: what a beacon looks like and what the reply says.
//!
//! # How LAN discovery works (for beginners)
//!
//! The phone does not know the host's IP address.  It broadcasts a small UDP
//! datagram containing the ASCII text `PC_REMOTE_DISCOVERY` to port 9999.
//! Every machine on the LAN receives it; the host answers with a unicast JSON
//! reply telling the phone which HTTP port and IPv4 addresses to use:
//!
//! ```text
//! {"port":8000,"ips":["192.168.1.20","10.0.0.5"]}
//! ```
//!
//! The reply contains only connection metadata.  Pairing codes and tokens are
//! never part of it.
//!
//! The socket loop itself lives in the server crate; this module only decides
//! whether a payload is a beacon and how the reply is encoded.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// The exact payload a client broadcasts.
pub const DISCOVERY_MESSAGE: &str = "PC_REMOTE_DISCOVERY";

/// Address reported when the host has no usable IPv4 interface.
pub const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// `true` iff `payload` equals [`DISCOVERY_MESSAGE`] byte for byte.
pub fn is_discovery_beacon(payload: &[u8]) -> bool {
    payload == DISCOVERY_MESSAGE.as_bytes()
}

/// The JSON body sent back to a beacon's source address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReply {
    pub port: u16,
    pub ips: Vec<String>,
}

impl DiscoveryReply {
    pub fn new(port: u16, ips: Vec<String>) -> Self {
        Self { port, ips }
    }

    /// Encodes the reply as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error; with the field types used here this
    /// cannot happen in practice.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Reduces a list of interface addresses to what a client can dial: IPv4 only,
/// loopback and unspecified removed, duplicates dropped with first-seen order
/// kept.  Falls back to `["127.0.0.1"]` when nothing is left.
pub fn collect_ipv4<I>(addrs: I) -> Vec<String>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut out: Vec<Ipv4Addr> = Vec::new();
    for addr in addrs {
        if let IpAddr::V4(v4) = addr {
            if v4.is_loopback() || v4.is_unspecified() || out.contains(&v4) {
                continue;
            }
            out.push(v4);
        }
    }

    if out.is_empty() {
        return vec![LOOPBACK_FALLBACK.to_string()];
    }
    out.into_iter().map(|ip| ip.to_string()).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn test_exact_beacon_is_recognised() {
        assert!(is_discovery_beacon(b"PC_REMOTE_DISCOVERY"));
    }

    #[test]
    fn test_near_miss_payloads_are_ignored() {
        assert!(!is_discovery_beacon(b"PC_REMOTE_DISCOVERY\n"));
        assert!(!is_discovery_beacon(b"pc_remote_discovery"));
        assert!(!is_discovery_beacon(b"PC_REMOTE"));
        assert!(!is_discovery_beacon(b""));
    }

    #[test]
    fn test_reply_serialises_to_expected_json() {
        // Arrange
        let reply = DiscoveryReply::new(8000, vec!["192.168.1.20".to_string()]);

        // Act
        let bytes = reply.to_bytes().unwrap();

        // Assert
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"port":8000,"ips":["192.168.1.20"]}"#
        );
    }

    #[test]
    fn test_collect_ipv4_filters_loopback_and_ipv6() {
        let addrs = vec![
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            IpAddr::V6("fe80::1".parse().unwrap()),
        ];
        assert_eq!(collect_ipv4(addrs), vec!["192.168.1.20".to_string()]);
    }

    #[test]
    fn test_collect_ipv4_deduplicates_in_order() {
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        let b = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(
            collect_ipv4(vec![a, b, a]),
            vec!["10.0.0.5".to_string(), "192.168.1.20".to_string()]
        );
    }

    #[test]
    fn test_collect_ipv4_falls_back_to_loopback() {
        let only_loopback = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
        assert_eq!(collect_ipv4(only_loopback), vec!["127.0.0.1".to_string()]);
        assert_eq!(collect_ipv4(Vec::new()), vec!["127.0.0.1".to_string()]);
    }
}
