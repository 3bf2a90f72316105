pub mod ads;
pub mod audit;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod state;
pub mod tools;
pub mod workflow;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use state::AppState;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    // MCP endpoint, behind the optional bearer check.
    let mcp = Router::new()
        .route("/mcp", post(mcp::server::mcp_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health (always public)
        .route("/api/health", get(handlers::health))
        .route("/api/health/ready", get(handlers::readiness))
        .merge(mcp)
        // Shared state
        .with_state(state)
}
