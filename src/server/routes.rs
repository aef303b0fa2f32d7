use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers;
use super::server::AppState;

/// Create API router with all endpoints
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/devices",
            get(handlers::list_devices).post(handlers::create_device),
        )
        .route("/devices/:id/status", patch(handlers::toggle_device_status))
}
