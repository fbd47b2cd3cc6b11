//! RequestGate: the authorization decision every protected route goes through.
//!
//! The gate is transport-agnostic.  The HTTP layer pulls the three relevant
//! headers out of a request, builds a [`GateRequest`] and maps the outcome to
//! a status code; nothing here knows about axum.
//!
//! # Decision order
//!
//! 1. `Authorization: Bearer <token>` must be present and the token valid,
//!    otherwise [`GateError::Unauthenticated`].
//! 2. For state-changing requests only, `X-Timestamp` / `X-Nonce` must pass
//!    the [`NonceLedger`], otherwise [`GateError::Replay`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::nonce::{NonceLedger, ReplayRejection};
use crate::tokens::TokenRegistry;

/// Errors produced by [`RequestGate::authorize`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("invalid or missing token")]
    Unauthenticated,
    /// The token is fine but the replay headers were rejected.
    #[error("{0}")]
    Replay(#[from] ReplayRejection),
}

/// The inputs the gate looks at, already extracted from the transport.
#[derive(Debug, Clone, Default)]
pub struct GateRequest<'a> {
    /// Raw value of the `Authorization` header.
    pub authorization: Option<&'a str>,
    pub state_changing: bool,
    pub timestamp: Option<&'a str>,
    pub nonce: Option<&'a str>,
}

/// Proof that a request passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedCaller {
    pub token: String,
}

pub struct RequestGate {
    tokens: Arc<TokenRegistry>,
    nonces: Arc<NonceLedger>,
}

impl RequestGate {
    pub fn new(tokens: Arc<TokenRegistry>, nonces: Arc<NonceLedger>) -> Self {
        Self { tokens, nonces }
    }

    /// Decides whether a request may proceed.
    ///
    /// # Errors
    ///
    /// - [`GateError::Unauthenticated`] for a missing, malformed, unknown or
    ///   expired bearer token.
    /// - [`GateError::Replay`] when a state-changing request fails the
    ///   timestamp/nonce checks.
    pub fn authorize(&self, request: &GateRequest<'_>) -> Result<AuthorizedCaller, GateError> {
        let token = request
            .authorization
            .and_then(parse_bearer)
            .ok_or(GateError::Unauthenticated)?;

        if !self.tokens.is_valid(token) {
            warn!("request rejected: unknown or expired token");
            return Err(GateError::Unauthenticated);
        }

        if request.state_changing {
            if let Err(reason) = self.nonces.validate(token, request.timestamp, request.nonce) {
                warn!(%reason, "request rejected by replay protection");
                return Err(reason.into());
            }
        }

        debug!(state_changing = request.state_changing, "request authorized");
        Ok(AuthorizedCaller {
            token: token.to_string(),
        })
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is treated as
/// absent.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let header = header.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// `true` for methods that change host state and therefore need replay
/// protection.  Everything except GET, HEAD and OPTIONS counts.
pub fn is_state_changing(method: &str) -> bool {
    !matches!(
        method.to_ascii_uppercase().as_str(),
        "GET" | "HEAD" | "OPTIONS"
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::nonce::NonceLedgerConfig;

    struct Fixture {
        clock: Arc<ManualClock>,
        gate: RequestGate,
        header: String,
    }

    fn make_gate() -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let tokens = Arc::new(TokenRegistry::new(clock.clone()));
        let nonces = Arc::new(NonceLedger::new(NonceLedgerConfig::default(), clock.clone()));
        tokens.register("good-token", Duration::days(30));
        Fixture {
            clock,
            gate: RequestGate::new(tokens, nonces),
            header: "Bearer good-token".to_string(),
        }
    }

    #[test]
    fn test_parse_bearer_accepts_any_scheme_case() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("  BEARER   abc  "), Some("abc"));
    }

    #[test]
    fn test_parse_bearer_rejects_other_schemes_and_empty_tokens() {
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer    "), None);
        assert_eq!(parse_bearer("abc"), None);
    }

    #[test]
    fn test_is_state_changing() {
        assert!(!is_state_changing("GET"));
        assert!(!is_state_changing("head"));
        assert!(!is_state_changing("OPTIONS"));
        assert!(is_state_changing("POST"));
        assert!(is_state_changing("DELETE"));
        assert!(is_state_changing("PATCH"));
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        let f = make_gate();
        let result = f.gate.authorize(&GateRequest::default());
        assert_eq!(result, Err(GateError::Unauthenticated));
        assert_eq!(result.unwrap_err().to_string(), "invalid or missing token");
    }

    #[test]
    fn test_unknown_token_is_unauthenticated() {
        let f = make_gate();
        let request = GateRequest {
            authorization: Some("Bearer nope"),
            ..Default::default()
        };
        assert_eq!(f.gate.authorize(&request), Err(GateError::Unauthenticated));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let f = make_gate();
        f.clock.advance(Duration::days(31));
        let request = GateRequest {
            authorization: Some(&f.header),
            ..Default::default()
        };
        assert_eq!(f.gate.authorize(&request), Err(GateError::Unauthenticated));
    }

    #[test]
    fn test_read_only_request_needs_no_nonce() {
        // Arrange
        let f = make_gate();
        let request = GateRequest {
            authorization: Some(&f.header),
            state_changing: false,
            ..Default::default()
        };

        // Act
        let caller = f.gate.authorize(&request).unwrap();

        // Assert
        assert_eq!(caller.token, "good-token");
    }

    #[test]
    fn test_state_changing_request_without_nonce_is_replay_rejection() {
        let f = make_gate();
        let request = GateRequest {
            authorization: Some(&f.header),
            state_changing: true,
            ..Default::default()
        };

        let result = f.gate.authorize(&request);

        assert_eq!(result, Err(GateError::Replay(ReplayRejection::MissingHeaders)));
        assert_eq!(result.unwrap_err().to_string(), "timestamp/nonce required");
    }

    #[test]
    fn test_state_changing_request_with_fresh_nonce_passes_once() {
        // Arrange
        let f = make_gate();
        let ts = f.clock.now().timestamp().to_string();
        let request = GateRequest {
            authorization: Some(&f.header),
            state_changing: true,
            timestamp: Some(&ts),
            nonce: Some("n-1"),
        };

        // Act
        let first = f.gate.authorize(&request);
        let second = f.gate.authorize(&request);

        // Assert
        assert!(first.is_ok());
        assert_eq!(second, Err(GateError::Replay(ReplayRejection::ReplayedNonce)));
    }

    #[test]
    fn test_bad_token_is_checked_before_nonce() {
        let f = make_gate();
        let request = GateRequest {
            authorization: Some("Bearer nope"),
            state_changing: true,
            ..Default::default()
        };
        assert_eq!(f.gate.authorize(&request), Err(GateError::Unauthenticated));
    }
}
