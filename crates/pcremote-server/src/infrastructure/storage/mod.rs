//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate
//!   directory (or an explicit `--config` path).
//! - Writing the effective configuration back out (`--write-config`).
//! - Providing sensible defaults when the file does not exist yet (first run).
//!
//! All runtime state (codes, tokens, nonces, sessions) is in memory only;
//! nothing here persists it.

pub mod config;
