//! Network infrastructure for the host server.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Listens for UDP `PC_REMOTE_DISCOVERY` broadcasts from
//!   phones on the local network and answers with the HTTP port and host
//!   addresses.  This is how phones find the host without manual IP entry.
//!
//! - **`interfaces`** – Lists this host's LAN addresses and classifies caller
//!   addresses as local or not.

pub mod discovery;
pub mod interfaces;
