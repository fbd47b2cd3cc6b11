//! PairingAuthority: the rotating pairing code and the code-for-token exchange.
//!
//! # Pairing flow (for beginners)
//!
//! ```text
//! Host                                   Phone
//! ────                                   ─────
//! rotate_code()  → "482913" (console)
//!                                        User reads the code off the screen
//!                                        POST /pairing/pair {code, clientName}
//! try_pair("482913", "android")
//!   → Ok(IssuedToken)  if the code matches and has not expired
//!   → Err(Rejected)    otherwise
//!                                        Stores the token, sends it as
//!                                        `Authorization: Bearer <token>`
//! ```
//!
//! The code is only ever shown on the operator's console (and, for devices on
//! the LAN, through `GET /pairing/code`), so knowing it proves physical
//! proximity to the host.  It rotates every few minutes, which bounds how long
//! a shoulder-surfed code stays useful.
//!
//! # Code states
//!
//! ```text
//!            time passes
//!   Active ───────────────► Expired
//!     ▲                        │
//!     └──── rotate_code() ◄────┘
//! ```
//!
//! There is no terminal state: the authority lives as long as the process.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{expiry_after, Clock};
use crate::tokens::{generate_token, TokenRegistry};

/// Number of digits in a pairing code.
pub const CODE_DIGITS: usize = 6;

/// Error returned by [`PairingAuthority::try_pair`].
///
/// There is deliberately a single variant: a caller must not be able to tell a
/// wrong code from an expired one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("invalid or expired pairing code")]
    Rejected,
}

/// Snapshot of the pairing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCode {
    /// Six ASCII digits; leading zeros are kept.
    pub value: String,
    pub expires_at_utc: DateTime<Utc>,
}

impl PairingCode {
    /// `true` while `now` is strictly before the expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at_utc
    }
}

/// A bearer token handed out by a successful pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at_utc: DateTime<Utc>,
}

/// Lifetimes used by the authority.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// How long a freshly rotated code stays valid.
    pub code_ttl: Duration,
    /// How long an issued token stays valid.
    pub token_ttl: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(5),
            token_ttl: Duration::days(30),
        }
    }
}

/// Owns the single process-wide pairing code.
pub struct PairingAuthority {
    config: PairingConfig,
    clock: Arc<dyn Clock>,
    tokens: Arc<TokenRegistry>,
    current: Mutex<PairingCode>,
}

impl PairingAuthority {
    /// Creates the authority and issues the first code immediately.
    pub fn new(config: PairingConfig, tokens: Arc<TokenRegistry>, clock: Arc<dyn Clock>) -> Self {
        let first = fresh_code(clock.now(), config.code_ttl);
        announce(&first);
        Self {
            config,
            clock,
            tokens,
            current: Mutex::new(first),
        }
    }

    /// Replaces the current code with a fresh one and announces it on the
    /// operator console.
    pub fn rotate_code(&self) -> PairingCode {
        let next = {
            let mut current = self.lock();
            *current = fresh_code(self.clock.now(), self.config.code_ttl);
            current.clone()
        };
        announce(&next);
        next
    }

    /// Returns the current code without side effects, even if it has expired.
    pub fn current_code(&self) -> PairingCode {
        self.lock().clone()
    }

    /// Returns the current code, rotating first if it has already expired.
    ///
    /// The expiry check and the rotation share one lock acquisition, so
    /// concurrent callers that find the same expired code agree on its
    /// replacement.
    pub fn active_code(&self) -> PairingCode {
        let (code, rotated) = {
            let mut current = self.lock();
            let rotated = self.replace_if_expired(&mut current);
            (current.clone(), rotated)
        };
        if rotated {
            debug!("pairing code expired before rotation; rotating now");
            announce(&code);
        }
        code
    }

    /// Exchanges a pairing code for a bearer token.
    ///
    /// `code` must equal the current code exactly; no trimming or case
    /// folding.  The comparison runs against whichever code is current when
    /// the lock is taken, and a rotation racing this call happens entirely
    /// before or entirely after it.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError::Rejected`] when `code` does not match or the
    /// current code has expired.
    pub fn try_pair(&self, code: &str, client_name: &str) -> Result<IssuedToken, PairingError> {
        let (matches, replacement) = {
            let mut current = self.lock();
            let matches = current.value == code;
            let replacement = self
                .replace_if_expired(&mut current)
                .then(|| current.clone());
            (matches, replacement)
        };

        if let Some(replacement) = replacement {
            warn!(client = client_name, "pairing attempt against an expired code");
            announce(&replacement);
            return Err(PairingError::Rejected);
        }
        if !matches {
            warn!(client = client_name, "pairing attempt with a wrong code");
            return Err(PairingError::Rejected);
        }

        let token = generate_token();
        let expires_at_utc = self.tokens.register(&token, self.config.token_ttl);
        info!(client = client_name, %expires_at_utc, "device paired");
        Ok(IssuedToken {
            token,
            expires_at_utc,
        })
    }

    /// Swaps in a fresh code when `current` has expired.  Returns whether it did.
    fn replace_if_expired(&self, current: &mut PairingCode) -> bool {
        let now = self.clock.now();
        if current.is_active_at(now) {
            return false;
        }
        *current = fresh_code(now, self.config.code_ttl);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PairingCode> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn fresh_code(now: DateTime<Utc>, ttl: Duration) -> PairingCode {
    PairingCode {
        value: generate_code(),
        expires_at_utc: expiry_after(now, ttl),
    }
}

/// Generates a uniformly random 6-digit code from the OS CSPRNG.
fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{n:0width$}", width = CODE_DIGITS)
}

fn announce(code: &PairingCode) {
    info!(
        target: "pcremote::pairing",
        code = %code.value,
        expires_at = %code.expires_at_utc,
        "pairing code: {}",
        code.value
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    struct Fixture {
        clock: Arc<ManualClock>,
        tokens: Arc<TokenRegistry>,
        authority: PairingAuthority,
    }

    fn make_authority() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let tokens = Arc::new(TokenRegistry::new(clock.clone()));
        let authority =
            PairingAuthority::new(PairingConfig::default(), Arc::clone(&tokens), clock.clone());
        Fixture {
            clock,
            tokens,
            authority,
        }
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6, "code must be exactly 6 digits: {code}");
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_new_authority_has_active_code() {
        let f = make_authority();
        let code = f.authority.current_code();
        assert!(code.is_active_at(f.clock.now()));
        assert_eq!(code.expires_at_utc - f.clock.now(), Duration::minutes(5));
    }

    #[test]
    fn test_rotate_code_replaces_expiry() {
        // Arrange
        let f = make_authority();
        f.clock.advance(Duration::minutes(2));

        // Act
        let rotated = f.authority.rotate_code();

        // Assert
        assert_eq!(rotated.expires_at_utc, f.clock.now() + Duration::minutes(5));
        assert_eq!(f.authority.current_code(), rotated);
    }

    #[test]
    fn test_try_pair_with_current_code_issues_valid_token() {
        // Arrange
        let f = make_authority();
        let code = f.authority.current_code().value;

        // Act
        let issued = f.authority.try_pair(&code, "test-client").expect("pair");

        // Assert
        assert_eq!(issued.token.len(), 64);
        assert!(f.tokens.is_valid(&issued.token));
        assert_eq!(issued.expires_at_utc, f.clock.now() + Duration::days(30));
    }

    #[test]
    fn test_try_pair_with_wrong_code_is_rejected_and_registers_nothing() {
        let f = make_authority();
        let wrong = if f.authority.current_code().value == "000000" {
            "000001"
        } else {
            "000000"
        };

        let result = f.authority.try_pair(wrong, "test-client");

        assert_eq!(result, Err(PairingError::Rejected));
        assert!(f.tokens.is_empty());
    }

    #[test]
    fn test_try_pair_with_expired_code_is_rejected() {
        // Arrange
        let f = make_authority();
        let code = f.authority.current_code().value;
        f.clock.advance(Duration::minutes(5));

        // Act
        let result = f.authority.try_pair(&code, "late-client");

        // Assert
        assert_eq!(result, Err(PairingError::Rejected));
        assert!(f.tokens.is_empty());
    }

    #[test]
    fn test_try_pair_against_expired_code_rotates_defensively() {
        let f = make_authority();
        let old = f.authority.current_code();
        f.clock.advance(Duration::minutes(6));

        let _ = f.authority.try_pair(&old.value, "late-client");

        assert!(f.authority.current_code().is_active_at(f.clock.now()));
    }

    #[test]
    fn test_wrong_and_expired_codes_produce_identical_errors() {
        let f = make_authority();
        let code = f.authority.current_code().value;
        let wrong = format!("{:06}", (code.parse::<u32>().unwrap() + 1) % 1_000_000);
        let wrong_result = f.authority.try_pair(&wrong, "a").unwrap_err();

        f.clock.advance(Duration::minutes(10));
        let expired_result = f.authority.try_pair(&code, "a").unwrap_err();

        assert_eq!(wrong_result.to_string(), expired_result.to_string());
    }

    #[test]
    fn test_code_stays_usable_for_second_device_until_expiry() {
        let f = make_authority();
        let code = f.authority.current_code().value;

        let first = f.authority.try_pair(&code, "phone").unwrap();
        let second = f.authority.try_pair(&code, "tablet").unwrap();

        assert_ne!(first.token, second.token);
        assert!(f.tokens.is_valid(&first.token));
        assert!(f.tokens.is_valid(&second.token));
    }

    #[test]
    fn test_old_code_is_rejected_after_rotation() {
        let f = make_authority();
        let old = f.authority.current_code().value;
        let mut new = f.authority.rotate_code();
        while new.value == old {
            new = f.authority.rotate_code();
        }

        assert_eq!(f.authority.try_pair(&old, "c"), Err(PairingError::Rejected));
        assert!(f.authority.try_pair(&new.value, "c").is_ok());
    }

    #[test]
    fn test_current_code_never_rotates() {
        let f = make_authority();
        let before = f.authority.current_code();
        f.clock.advance(Duration::hours(1));
        assert_eq!(f.authority.current_code(), before);
    }

    #[test]
    fn test_active_code_rotates_expired_code() {
        let f = make_authority();
        f.clock.advance(Duration::minutes(5));

        let active = f.authority.active_code();

        assert!(active.is_active_at(f.clock.now()));
    }

    #[test]
    fn test_active_code_keeps_unexpired_code() {
        let f = make_authority();
        let before = f.authority.current_code();
        f.clock.advance(Duration::minutes(4));
        assert_eq!(f.authority.active_code(), before);
    }

    #[test]
    fn test_try_pair_requires_exact_match() {
        let f = make_authority();
        let code = f.authority.current_code().value;

        let padded = f.authority.try_pair(&format!(" {code} "), "c");

        assert_eq!(padded, Err(PairingError::Rejected));
        assert!(f.tokens.is_empty());
    }

    #[test]
    fn test_concurrent_active_code_calls_agree_on_replacement() {
        // Arrange: every thread observes the same expired code
        let f = Arc::new(make_authority());
        f.clock.advance(Duration::minutes(6));
        let barrier = Arc::new(std::sync::Barrier::new(8));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let f = Arc::clone(&f);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    f.authority.active_code()
                })
            })
            .collect();
        let seen: Vec<PairingCode> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Assert: one rotation, and it is the code every caller got
        let current = f.authority.current_code();
        assert!(seen.iter().all(|code| *code == current));
    }
}
