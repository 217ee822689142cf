use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview control
        .route("/session/status", get(handlers::get_status))
        .route("/session/end", post(handlers::end_session))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // The candidate's browser page polls from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
