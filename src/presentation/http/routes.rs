//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // The gateway authenticates its own upgrade request
        .route("/gateway", get(ws_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                String::new(),
            )
        }
    }
}

/// API v1 routes (protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/friends", friend_routes())
        .nest("/chats", chat_routes())
        .route("/users/search", get(handlers::users::search_users))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn friend_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::friends::list_friends))
        .route(
            "/requests",
            get(handlers::friends::list_requests).post(handlers::friends::send_request),
        )
        .route("/requests/resolve", post(handlers::friends::resolve_request))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::chats::list_chats))
        .route("/{chat_id}/messages", get(handlers::chats::list_messages))
}
