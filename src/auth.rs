// AdsFlow - auth
// Optional Bearer token authentication middleware.
// If AUTH_SECRET env is set, `/mcp` requires `Authorization: Bearer <secret>`.
// If not set, auth is disabled (dev mode). Health routes are always public.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Middleware that enforces Bearer token auth when AUTH_SECRET is configured.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let secret = match state.config.auth_secret.as_deref() {
        Some(s) => s,
        None => return Ok(next.run(request).await),
    };

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token_matches(token, secret) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Auth failed: invalid token");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Auth failed: missing or malformed Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn token_matches(token: &str, secret: &str) -> bool {
    token.as_bytes().ct_eq(secret.as_bytes()).into()
}
