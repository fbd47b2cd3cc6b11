//! # pcremote-core
//!
//! Shared library for the PC Remote host containing the security and session
//! state machines and the LAN discovery wire format.
//!
//! This crate has zero dependencies on sockets, HTTP frameworks, or OS APIs.
//! Everything in it can be unit-tested with a [`ManualClock`] and no network.
//!
//! # Architecture overview (for beginners)
//!
//! PC Remote lets an Android phone drive a desktop PC over the local network.
//! Before the phone may send any command it has to *pair*: the host shows a
//! short numeric code on its console, the user types it on the phone, and the
//! phone exchanges it for a long-lived bearer token.
//!
//! This crate (`pcremote-core`) is the trusted heart of that flow.  It defines:
//!
//! - **`pairing`** – The rotating 6-digit pairing code and the exchange of a
//!   valid code for a token.
//!
//! - **`tokens`** – The registry of issued bearer tokens and their expiry.
//!
//! - **`nonce`** – Replay protection: every state-changing request carries a
//!   timestamp and a one-time nonce, and the ledger refuses to see the same
//!   nonce twice.
//!
//! - **`gate`** – Combines tokens and nonces into the single authorization
//!   decision made for every inbound request.
//!
//! - **`session`** – Optional "focus sessions" the phone keeps alive with
//!   heartbeats while a control screen is open.
//!
//! - **`discovery`** – The UDP beacon string and the JSON reply that tells a
//!   phone where the host is listening.
//!
//! - **`host`** – The abstract commands (power, input, clipboard, media) the
//!   host control surface accepts.
//!
//! - **`clock`** – The time source every state machine above reads from.

pub mod clock;
pub mod discovery;
pub mod gate;
pub mod host;
pub mod nonce;
pub mod pairing;
pub mod session;
pub mod tokens;

// Re-export the most-used types at the crate root so callers can write
// `pcremote_core::PairingAuthority` instead of `pcremote_core::pairing::PairingAuthority`.
pub use clock::{expiry_after, Clock, ManualClock, SystemClock};
pub use discovery::{DiscoveryReply, DISCOVERY_MESSAGE};
pub use gate::{AuthorizedCaller, GateError, GateRequest, RequestGate};
pub use host::{HostCommand, HostControl, HostControlError};
pub use nonce::{NonceLedger, NonceLedgerConfig, ReplayRejection};
pub use pairing::{IssuedToken, PairingAuthority, PairingCode, PairingConfig, PairingError};
pub use session::{Session, SessionError, SessionLease, SessionRegistry};
pub use tokens::TokenRegistry;
