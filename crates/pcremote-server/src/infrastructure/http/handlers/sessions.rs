use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use pcremote_core::{SessionError, SessionLease};
use serde::{Deserialize, Serialize};

use crate::infrastructure::http::response::{ApiError, AppJson, StatusOk};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionLease> for SessionResponse {
    fn from(lease: SessionLease) -> Self {
        Self {
            session_id: lease.session_id,
            expires_at: lease.expires_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SessionStartRequest>,
) -> Json<SessionResponse> {
    let lease = state
        .sessions
        .create(req.client_name.as_deref(), req.timeout_seconds);
    Json(lease.into())
}

pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SessionIdRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let lease = state.sessions.touch(&req.session_id)?;
    Ok(Json(lease.into()))
}

pub async fn end_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SessionIdRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    if state.sessions.end(&req.session_id) {
        Ok(StatusOk::ok())
    } else {
        Err(SessionError::NotFound.into())
    }
}

/// `GET /session/status/:id`.  Counts as a heartbeat.
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let lease = state.sessions.touch(&session_id)?;
    Ok(Json(lease.into()))
}
