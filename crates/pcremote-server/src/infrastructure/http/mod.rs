//! HTTP surface of the host server (axum).
//!
//! # Request flow (for beginners)
//!
//! ```text
//! TCP connection
//!   └─ TraceLayer                 (one span per request)
//!       └─ Router                 (/health, /pairing/*, /session/*, ...)
//!           └─ require_authorization   (protected routes only)
//!               └─ handler        (calls core registries / use cases)
//! ```
//!
//! # Sub-modules
//!
//! - **`routes`** – Builds the `Router`, served at `/` and `/api/v1`.
//! - **`middleware`** – Bearer + replay checks before protected handlers.
//! - **`handlers`** – One function per route, grouped by surface.
//! - **`response`** – `ApiError` and the `{detail}` error body.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

pub use routes::create_router;
