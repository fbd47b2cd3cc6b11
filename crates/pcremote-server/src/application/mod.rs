//! Application layer use cases for the host server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules in `pcremote-core`) and the infrastructure
//! (HTTP, UDP sockets, files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a client goal (e.g., "lock the
//!   PC" or "is this request allowed?").
//! - **Depend on abstractions** (traits such as `HostControl`) rather than
//!   concrete implementations, so the infrastructure can be swapped without
//!   changing this code.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`authorize_request`** – Turns the method and three headers of an
//!   inbound request into a gate decision.  Runs before every protected
//!   handler.
//!
//! - **`host_commands`** – Validates client input and turns it into
//!   `HostCommand`s for the injected host binding.

pub mod authorize_request;
pub mod host_commands;
