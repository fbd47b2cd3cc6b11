//! Infrastructure layer for the host server.
//!
//! Contains the OS- and network-facing adapters: the HTTP API, the UDP
//! discovery responder, background loops, configuration storage, host
//! metrics and the default host-control binding.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `pcremote_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod host_control;
pub mod http;
pub mod network;
pub mod scheduler;
pub mod storage;
pub mod system_info;
