use super::state::AppState;
use crate::session::SessionStatus;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session/status
/// Snapshot of the running interview
pub async fn get_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.status.borrow().clone())
}

/// POST /session/end
/// End the interview on behalf of the candidate
pub async fn end_session(State(state): State<AppState>) -> impl IntoResponse {
    let (session_id, current) = {
        let status = state.status.borrow();
        (status.session_id.clone(), status.state)
    };

    if current.is_terminal() {
        warn!("End requested for finished interview {} ({})", session_id, current);
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Interview {} already finished: {}", session_id, current),
            }),
        )
            .into_response();
    }

    info!("End requested for interview {} ({})", session_id, current);
    state.cancel.cancel();

    (
        StatusCode::ACCEPTED,
        Json(EndSessionResponse {
            session_id: session_id.clone(),
            status: "ending".to_string(),
            message: format!("Ending interview {}", session_id),
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
