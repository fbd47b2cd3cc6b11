//! NonceLedger: replay protection for state-changing requests.
//!
//! # Why nonces? (for beginners)
//!
//! A bearer token proves *who* is calling, but anyone who captures one
//! `POST /system/power {"action":"shutdown"}` on the Wi-Fi could send the
//! exact same bytes again later.  To prevent that, every state-changing
//! request also carries:
//!
//! - `X-Timestamp` – the client's Unix time in seconds, and
//! - `X-Nonce` – a value the client never reuses (a UUID in practice).
//!
//! The ledger accepts a request only if the timestamp is within one minute of
//! the host clock *and* the `(token, nonce)` pair has not been seen before.
//! Nonces are remembered for five minutes, which is longer than the two-minute
//! window a timestamp can be accepted in, so a captured request cannot be
//! replayed at any point in its life.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;

use crate::clock::{expiry_after, Clock};

/// Why a request was refused.  The `Display` text is the machine-readable
/// reason returned to the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplayRejection {
    #[error("timestamp/nonce required")]
    MissingHeaders,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("timestamp outside allowed window")]
    OutsideWindow,
    #[error("replay nonce")]
    ReplayedNonce,
}

/// Tunables for the ledger.
#[derive(Debug, Clone)]
pub struct NonceLedgerConfig {
    /// Maximum accepted distance between the client timestamp and `now`.
    pub timestamp_window: Duration,
    /// How long a seen nonce is remembered.
    pub nonce_ttl: Duration,
}

impl Default for NonceLedgerConfig {
    fn default() -> Self {
        Self {
            timestamp_window: Duration::seconds(60),
            nonce_ttl: Duration::minutes(5),
        }
    }
}

/// Map of `(token, nonce)` → expiry.
pub struct NonceLedger {
    config: NonceLedgerConfig,
    clock: Arc<dyn Clock>,
    seen: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl NonceLedger {
    pub fn new(config: NonceLedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Admits `(token, nonce)` at most once while it is remembered.
    ///
    /// The checks run in order and the first failure wins:
    ///
    /// 1. both headers present and the timestamp is an integer,
    /// 2. the timestamp is within the allowed window,
    /// 3. the pair has not been seen (atomic insert-if-absent),
    /// 4. expired entries are swept.
    ///
    /// # Errors
    ///
    /// Returns the [`ReplayRejection`] for the first failing check.
    pub fn validate(
        &self,
        token: &str,
        timestamp: Option<&str>,
        nonce: Option<&str>,
    ) -> Result<(), ReplayRejection> {
        let (timestamp, nonce) = match (timestamp.map(str::trim), nonce.map(str::trim)) {
            (Some(ts), Some(n)) if !ts.is_empty() && !n.is_empty() => (ts, n),
            _ => return Err(ReplayRejection::MissingHeaders),
        };
        let client_secs: i64 = timestamp
            .parse()
            .map_err(|_| ReplayRejection::InvalidTimestamp)?;

        let now = self.clock.now();
        let skew = now.timestamp().saturating_sub(client_secs).saturating_abs();
        if skew > self.config.timestamp_window.num_seconds() {
            return Err(ReplayRejection::OutsideWindow);
        }

        let mut seen = self.lock();
        let key = (token.to_string(), nonce.to_string());
        match seen.get(&key) {
            Some(expires_at) if *expires_at > now => return Err(ReplayRejection::ReplayedNonce),
            _ => {
                seen.insert(key, expiry_after(now, self.config.nonce_ttl));
            }
        }
        Self::sweep_locked(&mut seen, now);
        Ok(())
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = Self::sweep_locked(&mut self.lock(), now);
        if removed > 0 {
            debug!(removed, "swept expired nonces");
        }
        removed
    }

    /// Number of remembered nonces.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_locked(seen: &mut HashMap<(String, String), DateTime<Utc>>, now: DateTime<Utc>) -> usize {
        let before = seen.len();
        seen.retain(|_, expires_at| *expires_at > now);
        before - seen.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), DateTime<Utc>>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
