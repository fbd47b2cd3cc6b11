//! Shared server state.
//!
//! One `AppState` is built at startup and handed (as `Arc<AppState>`) to the
//! HTTP router, the background loops and the discovery responder.  Every
//! registry inside it owns its own lock, so no outer lock is needed here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pcremote_core::{
    Clock, HostControl, NonceLedger, PairingAuthority, RequestGate, SessionRegistry, SystemClock,
    TokenRegistry,
};

use crate::infrastructure::host_control::LoggingHostControl;
use crate::infrastructure::storage::config::ServerConfig;
use crate::infrastructure::system_info::{HostIdentity, MetricsStore};

pub struct AppState {
    pub config: ServerConfig,
    pub clock: Arc<dyn Clock>,
    pub pairing: PairingAuthority,
    pub tokens: Arc<TokenRegistry>,
    pub nonces: Arc<NonceLedger>,
    pub gate: RequestGate,
    pub sessions: SessionRegistry,
    pub host: Arc<dyn HostControl>,
    pub identity: HostIdentity,
    pub metrics: MetricsStore,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the production state: wall clock and the logging host binding.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(LoggingHostControl::new()))
    }

    /// Builds state around an explicit clock and host binding.  Tests use this
    /// with a `ManualClock` and a mock `HostControl`.
    pub fn with_parts(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostControl>,
    ) -> Arc<Self> {
        let tokens = Arc::new(TokenRegistry::new(Arc::clone(&clock)));
        let nonces = Arc::new(NonceLedger::new(config.nonce_config(), Arc::clone(&clock)));
        let pairing = PairingAuthority::new(
            config.pairing_config(),
            Arc::clone(&tokens),
            Arc::clone(&clock),
        );
        let gate = RequestGate::new(Arc::clone(&tokens), Arc::clone(&nonces));
        let sessions = SessionRegistry::with_default_timeout(
            Arc::clone(&clock),
            config.sessions.default_timeout_secs,
        );
        let started_at = clock.now();

        Arc::new(Self {
            config,
            clock,
            pairing,
            tokens,
            nonces,
            gate,
            sessions,
            host,
            identity: HostIdentity::detect(),
            metrics: MetricsStore::new(),
            started_at,
        })
    }
}
