//! Route handlers, grouped by surface.

pub mod control;
pub mod pairing;
pub mod sessions;
pub mod system;
