pub mod decisions;
pub mod events;
pub mod health;
pub mod submissions;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::domain::DomainError;
use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Submissions and status polling
        .route("/relay/submissions", post(submissions::create_submission))
        .route("/relay/submissions", get(submissions::list_submissions))
        .route(
            "/relay/submissions/:id/status",
            get(submissions::get_status),
        )
        .route("/relay/session/status", get(submissions::get_session_status))
        // Admin decisions
        .route(
            "/relay/submissions/:id/approve",
            post(decisions::approve),
        )
        .route("/relay/submissions/:id/deny", post(decisions::deny))
        .route(
            "/relay/submissions/:id/require-otp",
            post(decisions::require_otp),
        )
        // Observer event channel
        .route("/relay/events", get(events::events_ws))
        .with_state(state)
}

/// Map domain failures onto HTTP responses, uniformly across handlers.
pub(crate) fn error_response(err: DomainError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}
