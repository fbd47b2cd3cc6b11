use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{control, pairing, sessions, system};
use super::middleware::require_authorization;
use crate::AppState;

/// Path prefix the Android client uses.  Every route is also served at the root.
pub const API_PREFIX: &str = "/api/v1";

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = api_routes(Arc::clone(&state));

    Router::new()
        .merge(api.clone())
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Open routes -- reachable before pairing
    let open_routes = Router::new()
        .route("/health", get(system::health))
        .route("/pairing/code", get(pairing::get_pairing_code))
        .route("/pairing/pair", post(pairing::pair));

    // Protected routes -- bearer token always, timestamp/nonce on POST
    let protected_routes = Router::new()
        .route("/status", get(system::status))
        .route("/session/start", post(sessions::start_session))
        .route("/session/heartbeat", post(sessions::heartbeat))
        .route("/session/end", post(sessions::end_session))
        .route("/session/status/:id", get(sessions::session_status))
        .route("/system/status", get(system::system_status))
        .route("/system/metrics", get(system::system_metrics))
        .route("/system/power", post(control::power))
        .route("/system/volume/set", post(control::set_volume))
        .route("/mouse/move", post(control::mouse_move))
        .route("/mouse/click", post(control::mouse_click))
        .route("/keyboard/press", post(control::keyboard_press))
        .route("/clipboard", post(control::clipboard))
        .route("/media/:action", post(control::media))
        .route_layer(middleware::from_fn_with_state(state, require_authorization));

    Router::new().merge(open_routes).merge(protected_routes)
}
