//! Bearer-token registry.
//!
//! A token is created only by a successful pairing exchange (see
//! [`crate::pairing::PairingAuthority::try_pair`]) and lives until its expiry.
//! There is no revocation: restarting the host drops every token, which is the
//! only way to un-pair all devices at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::clock::{expiry_after, Clock};

/// Number of random bytes in a token (256 bits of entropy).
pub const TOKEN_BYTES: usize = 32;

/// Generates a fresh opaque token: 32 bytes from the OS CSPRNG, hex encoded
/// (64 characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory map from issued token to expiry.
pub struct TokenRegistry {
    clock: Arc<dyn Clock>,
    tokens: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl TokenRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `token` with expiry `now + ttl` and returns that expiry.
    ///
    /// Registering the same token again overwrites its expiry.  A `ttl` past
    /// the end of the calendar saturates instead of overflowing.
    pub fn register(&self, token: &str, ttl: Duration) -> DateTime<Utc> {
        let expires_at = expiry_after(self.clock.now(), ttl);
        self.lock().insert(token.to_string(), expires_at);
        expires_at
    }

    /// Returns `true` iff `token` was issued and has not yet expired.
    pub fn is_valid(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let now = self.clock.now();
        self.lock()
            .get(token)
            .is_some_and(|expires_at| *expires_at > now)
    }

    /// Drops every expired token and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut tokens = self.lock();
        let before = tokens.len();
        tokens.retain(|_, expires_at| *expires_at > now);
        let removed = before - tokens.len();
        if removed > 0 {
            debug!(removed, "purged expired tokens");
        }
        removed
    }

    /// Number of tokens currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn make_registry() -> (Arc<ManualClock>, TokenRegistry) {
        let clock = Arc::new(ManualClock::starting_now());
        let registry = TokenRegistry::new(clock.clone());
        (clock, registry)
    }

    #[test]
    fn test_generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_registered_token_is_valid() {
        // Arrange
        let (_clock, registry) = make_registry();
        let token = generate_token();

        // Act
        registry.register(&token, Duration::days(30));

        // Assert
        assert!(registry.is_valid(&token));
    }

    #[test]
    fn test_empty_token_is_never_valid() {
        let (_clock, registry) = make_registry();
        registry.register("", Duration::days(1));
        assert!(!registry.is_valid(""));
    }

    #[test]
    fn test_unissued_token_is_invalid() {
        let (_clock, registry) = make_registry();
        registry.register(&generate_token(), Duration::days(1));
        assert!(!registry.is_valid(&generate_token()));
    }

    #[test]
    fn test_token_is_invalid_once_expired() {
        // Arrange
        let (clock, registry) = make_registry();
        registry.register("tok", Duration::seconds(10));

        // Act
        clock.advance(Duration::seconds(10));

        // Assert: expiry is exclusive
        assert!(!registry.is_valid("tok"));
    }

    #[test]
    fn test_register_twice_overwrites_expiry() {
        let (clock, registry) = make_registry();
        registry.register("tok", Duration::seconds(10));
        registry.register("tok", Duration::seconds(100));
        clock.advance(Duration::seconds(50));
        assert!(registry.is_valid("tok"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_purge_expired_removes_only_expired_tokens() {
        let (clock, registry) = make_registry();
        registry.register("short", Duration::seconds(5));
        registry.register("long", Duration::days(1));
        clock.advance(Duration::seconds(6));

        let removed = registry.purge_expired();

        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_valid("long"));
    }

    #[test]
    fn test_register_with_out_of_range_ttl_does_not_panic() {
        // Arrange: ten trillion seconds is past chrono's calendar
        let (_clock, registry) = make_registry();
        let ttl = Duration::try_seconds(10_000_000_000_000).unwrap();

        // Act
        let expires_at = registry.register("tok", ttl);

        // Assert
        assert_eq!(expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(registry.is_valid("tok"));
    }
}
