//! SessionRegistry: focus sessions kept alive by client heartbeats.
//!
//! A session is independent of authentication.  A paired phone opens one when
//! a control screen comes to the foreground and sends a heartbeat every few
//! seconds; the UI uses the lease to show whether the host still considers
//! the phone "hands on".
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//! create() ──► Active ──touch()──► Active (last_seen = now)
//!                │  │
//!         end()  │  └── now - last_seen > timeout ──► Expired (removed)
//!                ▼                                        │
//!             removed                     next touch() ──► NotFound
//! ```
//!
//! Expiry is lazy: it is noticed by `touch()` or by the periodic
//! [`SessionRegistry::sweep_expired`] housekeeping pass.
//!
//! # Concurrency
//!
//! Every operation takes the registry lock once and finishes before releasing
//! it, so operations on one id are linearizable.  A touch that observes
//! expiry removes the entry under the same lock, so no later touch can revive
//! it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;

/// Shortest allowed session timeout in seconds.
pub const MIN_TIMEOUT_SECS: i64 = 30;
/// Longest allowed session timeout in seconds (24 hours).
pub const MAX_TIMEOUT_SECS: i64 = 24 * 60 * 60;
/// Timeout used when the client does not ask for one (15 minutes).
pub const DEFAULT_TIMEOUT_SECS: i64 = 15 * 60;
/// Client name recorded when the client does not send one.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of a lookup that did not produce a lease.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No session with this id exists (or it was already removed).
    #[error("Session not found.")]
    NotFound,
    /// The session existed but its heartbeat lapsed; it has now been removed.
    #[error("Session expired.")]
    Expired,
}

/// State of one focus session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub timeout_seconds: i64,
}

impl Session {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.last_seen > Duration::seconds(self.timeout_seconds)
    }

    fn lease_from(&self, now: DateTime<Utc>) -> SessionLease {
        SessionLease {
            session_id: self.id.clone(),
            expires_at: now + Duration::seconds(self.timeout_seconds),
        }
    }
}

/// What the client gets back from `create` and `touch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLease {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// In-memory registry of focus sessions.
pub struct SessionRegistry {
    clock: Arc<dyn Clock>,
    default_timeout_secs: i64,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default_timeout(clock, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a registry whose sessions default to `default_timeout_secs`
    /// when the client does not ask for a timeout.
    pub fn with_default_timeout(clock: Arc<dyn Clock>, default_timeout_secs: i64) -> Self {
        Self {
            clock,
            default_timeout_secs: clamp_timeout(default_timeout_secs),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a new session.  `timeout_seconds` is clamped to `[30, 86400]`.
    pub fn create(&self, client_name: Option<&str>, timeout_seconds: Option<i64>) -> SessionLease {
        let now = self.clock.now();
        let timeout_seconds = clamp_timeout(timeout_seconds.unwrap_or(self.default_timeout_secs));
        let client_name = client_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();

        let mut sessions = self.lock();
        let mut id = Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let session = Session {
            id: id.clone(),
            client_name,
            created_at: now,
            last_seen: now,
            timeout_seconds,
        };
        let lease = session.lease_from(now);
        debug!(session_id = %id, client = %session.client_name, timeout_seconds, "session started");
        sessions.insert(id, session);
        lease
    }

    /// Records a heartbeat for `session_id`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotFound`] if the id is unknown.
    /// - [`SessionError::Expired`] if the heartbeat lapsed; the session is
    ///   removed as part of this call.
    pub fn touch(&self, session_id: &str) -> Result<SessionLease, SessionError> {
        let now = self.clock.now();
        let mut sessions = self.lock();

        let session = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;
        if session.is_expired_at(now) {
            sessions.remove(session_id);
            debug!(session_id, "session expired on touch");
            return Err(SessionError::Expired);
        }

        session.last_seen = session.last_seen.max(now);
        Ok(session.lease_from(session.last_seen))
    }

    /// Ends a session.  Returns `true` if a session was removed.
    pub fn end(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            debug!(session_id, "session ended");
        }
        removed
    }

    /// Returns a snapshot of a session without touching it.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    /// Removes every session whose heartbeat lapsed; returns how many.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clamps a requested timeout to the allowed range.
pub fn clamp_timeout(requested: i64) -> i64 {
    requested.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn make_registry() -> (Arc<ManualClock>, SessionRegistry) {
        let clock = Arc::new(ManualClock::starting_now());
        let registry = SessionRegistry::new(clock.clone());
        (clock, registry)
    }

    #[test]
    fn test_registry_starts_empty() {
        let (_clock, registry) = make_registry();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_returns_lease_expiring_after_timeout() {
        // Arrange
        let (clock, registry) = make_registry();

        // Act
        let lease = registry.create(Some("c"), Some(60));

        // Assert
        assert_eq!(lease.expires_at, clock.now() + Duration::seconds(60));
        let stored = registry.get(&lease.session_id).unwrap();
        assert_eq!(stored.client_name, "c");
        assert_eq!(stored.created_at, clock.now());
        assert_eq!(stored.last_seen, clock.now());
    }

    #[test]
    fn test_create_clamps_timeout_to_allowed_range() {
        let (_clock, registry) = make_registry();
        let low = registry.create(None, Some(1));
        let high = registry.create(None, Some(1_000_000));
        let negative = registry.create(None, Some(-5));
        assert_eq!(registry.get(&low.session_id).unwrap().timeout_seconds, 30);
        assert_eq!(registry.get(&high.session_id).unwrap().timeout_seconds, 86_400);
        assert_eq!(registry.get(&negative.session_id).unwrap().timeout_seconds, 30);
    }

    #[test]
    fn test_create_defaults_name_and_timeout() {
        let (_clock, registry) = make_registry();
        let lease = registry.create(None, None);
        let stored = registry.get(&lease.session_id).unwrap();
        assert_eq!(stored.client_name, UNKNOWN_CLIENT);
        assert_eq!(stored.timeout_seconds, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_create_generates_unique_ids() {
        let (_clock, registry) = make_registry();
        let a = registry.create(None, None);
        let b = registry.create(None, None);
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_touch_within_timeout_refreshes_lease() {
        // Arrange
        let (clock, registry) = make_registry();
        let lease = registry.create(Some("c"), Some(60));

        // Act
        clock.advance(Duration::seconds(30));
        let refreshed = registry.touch(&lease.session_id).unwrap();

        // Assert
        assert_eq!(refreshed.session_id, lease.session_id);
        assert!(refreshed.expires_at > lease.expires_at);
        assert_eq!(refreshed.expires_at, clock.now() + Duration::seconds(60));
    }

    #[test]
    fn test_touch_after_timeout_is_expired_then_not_found() {
        // Arrange
        let (clock, registry) = make_registry();
        let lease = registry.create(Some("c"), Some(60));

        // Act
        clock.advance(Duration::seconds(61));
        let first = registry.touch(&lease.session_id);
        let second = registry.touch(&lease.session_id);

        // Assert
        assert_eq!(first, Err(SessionError::Expired));
        assert_eq!(second, Err(SessionError::NotFound));
    }

    #[test]
    fn test_touch_exactly_at_timeout_is_still_active() {
        let (clock, registry) = make_registry();
        let lease = registry.create(None, Some(60));
        clock.advance(Duration::seconds(60));
        assert!(registry.touch(&lease.session_id).is_ok());
    }

    #[test]
    fn test_touch_unknown_id_is_not_found() {
        let (_clock, registry) = make_registry();
        assert_eq!(registry.touch("nope"), Err(SessionError::NotFound));
    }

    #[test]
    fn test_last_seen_never_moves_backwards() {
        let (clock, registry) = make_registry();
        let lease = registry.create(None, Some(600));
        clock.advance(Duration::seconds(10));
        registry.touch(&lease.session_id).unwrap();
        let seen = registry.get(&lease.session_id).unwrap().last_seen;

        clock.advance(Duration::seconds(-5));
        registry.touch(&lease.session_id).unwrap();

        assert_eq!(registry.get(&lease.session_id).unwrap().last_seen, seen);
    }

    #[test]
    fn test_end_active_session_returns_true_then_not_found() {
        let (_clock, registry) = make_registry();
        let lease = registry.create(None, None);
        assert!(registry.end(&lease.session_id));
        assert_eq!(registry.touch(&lease.session_id), Err(SessionError::NotFound));
    }

    #[test]
    fn test_end_unknown_session_returns_false() {
        let (_clock, registry) = make_registry();
        assert!(!registry.end("nope"));
    }

    #[test]
    fn test_sweep_expired_removes_only_lapsed_sessions() {
        let (clock, registry) = make_registry();
        let short = registry.create(None, Some(30));
        let long = registry.create(None, Some(3600));
        clock.advance(Duration::seconds(31));

        let removed = registry.sweep_expired();

        assert_eq!(removed, 1);
        assert!(registry.get(&short.session_id).is_none());
        assert!(registry.get(&long.session_id).is_some());
    }

    #[test]
    fn test_concurrent_touches_never_revive_expired_session() {
        // Arrange
        let (clock, registry) = make_registry();
        let registry = Arc::new(registry);
        let lease = registry.create(None, Some(30));
        clock.advance(Duration::seconds(31));

        // Act
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let id = lease.session_id.clone();
                std::thread::spawn(move || registry.touch(&id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Assert: exactly one caller saw the expiry, the rest saw it gone
        let expired = results.iter().filter(|r| **r == Err(SessionError::Expired)).count();
        let missing = results.iter().filter(|r| **r == Err(SessionError::NotFound)).count();
        assert_eq!(expired, 1);
        assert_eq!(missing, 7);
        assert!(registry.is_empty());
    }
}
