use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infrastructure::http::response::StatusOk;
use crate::infrastructure::network::interfaces::local_ipv4_addresses;
use crate::infrastructure::system_info::{MemoryInfo, MetricsSnapshot};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub uptime_seconds: i64,
    pub machine_name: String,
    pub user_name: String,
    pub ips: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatusResponse {
    pub cpu_percent: f64,
    pub memory: MemoryInfo,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /health`.  Open, so a phone can check an address before pairing.
pub async fn health() -> Json<StatusOk> {
    StatusOk::ok()
}

/// `GET /status`
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let uptime_seconds = (state.clock.now() - state.started_at).num_seconds().max(0);
    Json(StatusResponse {
        uptime_seconds,
        machine_name: state.identity.machine_name.clone(),
        user_name: state.identity.user_name.clone(),
        ips: local_ipv4_addresses(),
    })
}

/// `GET /system/status`: CPU and memory from the latest sample.
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatusResponse> {
    let snapshot = state.metrics.snapshot();
    Json(SystemStatusResponse {
        cpu_percent: snapshot.cpu_usage_percent,
        memory: snapshot.memory,
    })
}

/// `GET /system/metrics`
pub async fn system_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
