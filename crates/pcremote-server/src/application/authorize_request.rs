//! AuthorizeRequestUseCase: decides whether an inbound request may reach its
//! handler.
//!
//! The HTTP middleware extracts the method and three header values and calls
//! [`authorize_request`]; the result is either the authorized caller or the
//! [`GateError`] the middleware turns into a 401/400 response.

use pcremote_core::gate::{is_state_changing, GateRequest};
use pcremote_core::{AuthorizedCaller, GateError, RequestGate};
use tracing::debug;

/// Raw header values relevant to authorization, as read off the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCredentials<'a> {
    pub authorization: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub nonce: Option<&'a str>,
}

/// Runs the gate for a request with the given HTTP `method`.
///
/// Read-only methods (GET, HEAD, OPTIONS) only need a valid bearer token;
/// every other method also needs fresh `X-Timestamp` / `X-Nonce` values.
///
/// # Errors
///
/// Propagates the [`GateError`] from [`RequestGate::authorize`].
pub fn authorize_request(
    gate: &RequestGate,
    method: &str,
    credentials: RequestCredentials<'_>,
) -> Result<AuthorizedCaller, GateError> {
    let state_changing = is_state_changing(method);
    debug!(method, state_changing, "authorizing request");
    gate.authorize(&GateRequest {
        authorization: credentials.authorization,
        state_changing,
        timestamp: credentials.timestamp,
        nonce: credentials.nonce,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use pcremote_core::{Clock, ManualClock, NonceLedger, NonceLedgerConfig, ReplayRejection, TokenRegistry};

    use super::*;

    fn make_gate() -> (Arc<ManualClock>, RequestGate) {
        let clock = Arc::new(ManualClock::starting_now());
        let tokens = Arc::new(TokenRegistry::new(clock.clone()));
        tokens.register("tok", Duration::days(1));
        let nonces = Arc::new(NonceLedger::new(NonceLedgerConfig::default(), clock.clone()));
        (clock, RequestGate::new(tokens, nonces))
    }

    #[test]
    fn test_get_with_token_and_no_nonce_is_authorized() {
        // Arrange
        let (_clock, gate) = make_gate();
        let credentials = RequestCredentials {
            authorization: Some("Bearer tok"),
            ..Default::default()
        };

        // Act
        let result = authorize_request(&gate, "GET", credentials);

        // Assert
        assert_eq!(result.unwrap().token, "tok");
    }

    #[test]
    fn test_post_without_nonce_is_rejected() {
        let (_clock, gate) = make_gate();
        let credentials = RequestCredentials {
            authorization: Some("Bearer tok"),
            ..Default::default()
        };

        let result = authorize_request(&gate, "POST", credentials);

        assert_eq!(result, Err(GateError::Replay(ReplayRejection::MissingHeaders)));
    }

    #[test]
    fn test_post_with_fresh_nonce_is_authorized() {
        let (clock, gate) = make_gate();
        let ts = clock.now().timestamp().to_string();
        let credentials = RequestCredentials {
            authorization: Some("Bearer tok"),
            timestamp: Some(&ts),
            nonce: Some("abc"),
        };

        assert!(authorize_request(&gate, "POST", credentials).is_ok());
    }

    #[test]
    fn test_missing_token_is_unauthenticated_for_any_method() {
        let (_clock, gate) = make_gate();
        for method in ["GET", "POST"] {
            let result = authorize_request(&gate, method, RequestCredentials::default());
            assert_eq!(result, Err(GateError::Unauthenticated), "method {method}");
        }
    }
}
