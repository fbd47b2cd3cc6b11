//! Local network interface helpers.
//!
//! - [`local_ipv4_addresses`] lists the addresses a phone on the LAN can use
//!   to reach this host.  Both the discovery reply and `GET /status` report it.
//! - [`is_local_network`] decides whether a caller address belongs to the
//!   local network.  `GET /pairing/code` uses it so the code is never served
//!   to a caller routed in from the internet.

use std::net::IpAddr;

use pcremote_core::discovery::collect_ipv4;
use tracing::warn;

/// Non-loopback IPv4 addresses of this host's interfaces, deduplicated.
/// Falls back to `["127.0.0.1"]` when none can be found.
pub fn local_ipv4_addresses() -> Vec<String> {
    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => collect_ipv4(interfaces.into_iter().map(|(_, ip)| ip)),
        Err(e) => {
            warn!(error = %e, "could not enumerate network interfaces");
            collect_ipv4(local_ip_address::local_ip().ok())
        }
    }
}

/// `true` for loopback, RFC 1918 private, link-local, IPv6 unique-local and
/// link-local addresses, and IPv4-mapped IPv6 forms of those.
pub fn is_local_network(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()           // 127.0.0.0/8
            || v4.is_private()         // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
            || v4.is_link_local() // 169.254.0.0/16
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()           // ::1
            // ::ffff:x.x.x.x, check the inner v4
            || v6.to_ipv4_mapped()
                .map(|v4| is_local_network(IpAddr::V4(v4)))
                .unwrap_or(false)
            // fc00::/7 (unique local)
            || (v6.segments()[0] & 0xfe00) == 0xfc00
            // fe80::/10 (link-local)
            || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
