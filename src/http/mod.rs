//! HTTP API server for the presentation layer
//!
//! This module provides a small REST API over the running interview:
//! - GET /session/status - Current state, status text, meter level
//! - POST /session/end - End the interview
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
