use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// GET /api/health: status, uptime and pending confirmation count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.is_ready() { "ok" } else { "starting" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        app: "AdsFlow".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        pending_confirmations: state.registry.pending_count().await,
        developer_token_configured: state.config.developer_token.is_some(),
        oauth_client_configured: state.config.oauth_client_id.is_some()
            && state.config.oauth_client_secret.is_some(),
    })
}

/// GET /api/health/ready: lightweight readiness probe (no locks).
pub async fn readiness(State(state): State<AppState>) -> Response {
    let body = ReadinessResponse {
        ready: state.is_ready(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    if body.ready {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}
