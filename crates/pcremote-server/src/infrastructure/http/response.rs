//! Error responses and the JSON body extractor.
//!
//! Every error leaves the server as `{"detail": "<short reason>"}` with the
//! matching status code.  Domain errors convert into [`ApiError`] with `?`, so
//! handlers never build status codes by hand.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pcremote_core::{GateError, PairingError, SessionError};
use serde::{Deserialize, Serialize};

use crate::application::host_commands::HostCommandError;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Unified error type for handlers and middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated => Self::unauthorized(err.to_string()),
            GateError::Replay(reason) => Self::bad_request(reason.to_string()),
        }
    }
}

impl From<PairingError> for ApiError {
    fn from(err: PairingError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match err {
            SessionError::NotFound => StatusCode::NOT_FOUND,
            SessionError::Expired => StatusCode::GONE,
        };
        Self::new(status, err.to_string())
    }
}

impl From<HostCommandError> for ApiError {
    fn from(err: HostCommandError) -> Self {
        match err {
            HostCommandError::Unsupported | HostCommandError::InvalidRequest(_) => {
                Self::bad_request(err.to_string())
            }
            HostCommandError::Failed => Self::internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// `axum::Json` with rejections rendered as `{detail}` 400 responses.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `{"status": "ok"}`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusOk {
    pub status: String,
}

impl StatusOk {
    pub fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
