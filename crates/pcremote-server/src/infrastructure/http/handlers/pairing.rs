use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::infrastructure::http::response::{ApiError, AppJson};
use crate::infrastructure::network::interfaces::is_local_network;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeResponse {
    pub value: String,
    pub expires_at_utc: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingTokenResponse {
    pub token: String,
    pub expires_at_utc: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /pairing/code`, only for callers on the local network.
pub async fn get_pairing_code(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<Json<PairingCodeResponse>, ApiError> {
    if !is_local_network(peer.ip()) {
        warn!(%peer, "pairing code requested from outside the local network");
        return Err(ApiError::forbidden(
            "pairing code is only available on the local network",
        ));
    }

    let code = state.pairing.active_code();
    Ok(Json(PairingCodeResponse {
        value: code.value,
        expires_at_utc: code.expires_at_utc,
    }))
}

/// `POST /pairing/pair`: exchanges the code for a bearer token.
pub async fn pair(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<PairRequest>,
) -> Result<Json<PairingTokenResponse>, ApiError> {
    let client_name = req
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("unknown");

    let issued = state.pairing.try_pair(&req.code, client_name)?;
    Ok(Json(PairingTokenResponse {
        token: issued.token,
        expires_at_utc: issued.expires_at_utc,
    }))
}
