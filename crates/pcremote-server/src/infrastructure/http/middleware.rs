//! Authorization middleware.
//!
//! Applied with `route_layer` to every protected route.  It reads the
//! `Authorization`, `X-Timestamp` and `X-Nonce` headers, runs the gate, and
//! either short-circuits with the gate's error or stores the
//! [`AuthorizedCaller`](pcremote_core::AuthorizedCaller) in the request
//! extensions and continues.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::response::ApiError;
use crate::application::authorize_request::{authorize_request, RequestCredentials};
use crate::AppState;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const NONCE_HEADER: &str = "x-nonce";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn require_authorization(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let caller = authorize_request(
        &state.gate,
        request.method().as_str(),
        RequestCredentials {
            authorization: header(headers, AUTHORIZATION.as_str()),
            timestamp: header(headers, TIMESTAMP_HEADER),
            nonce: header(headers, NONCE_HEADER),
        },
    )?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
