//! Host-control handlers.  Each one unpacks its body and delegates to
//! [`HostCommandUseCase`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::application::host_commands::HostCommandUseCase;
use crate::infrastructure::http::response::{ApiError, AppJson, StatusOk};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerRequest {
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerResponse {
    pub status: String,
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseMoveRequest {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub absolute: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseClickRequest {
    #[serde(default)]
    pub button: Option<String>,
    #[serde(default)]
    pub clicks: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardPressRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub presses: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardRequest {
    pub text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    #[serde(default)]
    pub steps: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRequest {
    pub level: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResponse {
    pub status: String,
    pub level: u8,
}

fn use_case(state: &AppState) -> HostCommandUseCase {
    HostCommandUseCase::new(Arc::clone(&state.host))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn power(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<PowerRequest>,
) -> Result<Json<PowerResponse>, ApiError> {
    let action = use_case(&state).power(&req.action)?;
    Ok(Json(PowerResponse {
        status: "ok".to_string(),
        action: action.to_string(),
    }))
}

pub async fn mouse_move(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<MouseMoveRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    use_case(&state).mouse_move(req.x, req.y, req.absolute)?;
    Ok(StatusOk::ok())
}

pub async fn mouse_click(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<MouseClickRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    use_case(&state).mouse_click(req.button.as_deref(), req.clicks)?;
    Ok(StatusOk::ok())
}

pub async fn keyboard_press(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<KeyboardPressRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    use_case(&state).key_press(req.key.as_deref(), req.keys.as_deref(), req.presses)?;
    Ok(StatusOk::ok())
}

pub async fn clipboard(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ClipboardRequest>,
) -> Result<Json<StatusOk>, ApiError> {
    use_case(&state).set_clipboard(req.text)?;
    Ok(StatusOk::ok())
}

/// `POST /media/:action`.  The body is optional; an empty body means one step.
pub async fn media(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    body: Bytes,
) -> Result<Json<StatusOk>, ApiError> {
    let req: MediaRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MediaRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };
    use_case(&state).media(&action, req.steps)?;
    Ok(StatusOk::ok())
}

/// `POST /system/volume/set`.  Out-of-range levels are clamped to 0..=100.
pub async fn set_volume(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VolumeRequest>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let level = use_case(&state).set_volume(req.level)?;
    Ok(Json(VolumeResponse {
        status: "ok".to_string(),
        level: level.percent(),
    }))
}
