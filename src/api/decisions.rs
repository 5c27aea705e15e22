//! Admin decision endpoints: approve, deny, require-OTP.
//!
//! Each is gated by the shared admin secret and resolves through the
//! store's transition table. Approval hands the job to the automation
//! engine on a detached task; the submitter keeps polling meanwhile.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::error_response;
use crate::auth::authorize_admin;
use crate::automation::{JobRequest, JobResult};
use crate::domain::{DomainError, LoginStatus};
use crate::models::pending_login;
use crate::models::ActorKind;
use crate::services::{JobOutcome, TransitionOpts};
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct DecisionBody {
    secret: Option<String>,
    reason: Option<String>,
}

#[derive(Deserialize)]
pub struct SecretQuery {
    secret: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/relay/submissions/{id}/approve",
    responses(
        (status = 200, description = "Approved; automation launched"),
        (status = 401, description = "Missing or mismatched admin secret"),
        (status = 404, description = "Unknown submission id"),
        (status = 409, description = "Not approvable from the current status")
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SecretQuery>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> impl IntoResponse {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match decide(&state, &headers, &query, &body, &id, LoginStatus::Approved).await {
        Ok(Decided::Applied(record)) => {
            spawn_automation(&state, record.clone());
            (StatusCode::OK, Json(record)).into_response()
        }
        Ok(Decided::AlreadyThere(record)) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/relay/submissions/{id}/deny",
    responses(
        (status = 200, description = "Denied"),
        (status = 401, description = "Missing or mismatched admin secret"),
        (status = 404, description = "Unknown submission id"),
        (status = 409, description = "Not deniable from the current status")
    )
)]
pub async fn deny(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SecretQuery>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> impl IntoResponse {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match decide(&state, &headers, &query, &body, &id, LoginStatus::Denied).await {
        Ok(Decided::Applied(record)) | Ok(Decided::AlreadyThere(record)) => {
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/relay/submissions/{id}/require-otp",
    responses(
        (status = 200, description = "Second factor requested"),
        (status = 401, description = "Missing or mismatched admin secret"),
        (status = 404, description = "Unknown submission id"),
        (status = 409, description = "Only pending submissions can be moved here")
    )
)]
pub async fn require_otp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SecretQuery>,
    headers: HeaderMap,
    body: Option<Json<DecisionBody>>,
) -> impl IntoResponse {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match decide(&state, &headers, &query, &body, &id, LoginStatus::OtpRequired).await {
        Ok(Decided::Applied(record)) | Ok(Decided::AlreadyThere(record)) => {
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

enum Decided {
    Applied(pending_login::Model),
    /// Repeat of an already-applied decision: returned unchanged, no new
    /// audit event, no automation re-launch
    AlreadyThere(pending_login::Model),
}

async fn decide(
    state: &AppState,
    headers: &HeaderMap,
    query: &SecretQuery,
    body: &DecisionBody,
    id: &str,
    target: LoginStatus,
) -> Result<Decided, DomainError> {
    authorize_admin(
        state.admin_secret.as_deref(),
        headers,
        query.secret.as_deref(),
        body.secret.as_deref(),
    )?;

    let current = state.store.get(id).await?;
    if current.status() == target {
        return Ok(Decided::AlreadyThere(current));
    }

    let updated = state
        .store
        .transition(
            id,
            target,
            TransitionOpts {
                actor: ActorKind::Admin,
                note: body.reason.clone(),
                ..Default::default()
            },
        )
        .await?;

    Ok(Decided::Applied(updated))
}

/// Launch the automation flow for a freshly approved job. Detached from
/// the request: cancelling the submitter's poll does not stop it.
fn spawn_automation(state: &AppState, record: pending_login::Model) {
    let engine = state.engine.clone();
    let store = state.store.clone();

    tokio::spawn(async move {
        let request = JobRequest {
            platform: record.platform.clone(),
            username: record.username.clone(),
            password: record.password.clone(),
            profile_ref: record.profile_ref.clone(),
            otp: record.otp.clone(),
            dry_run: false,
        };

        let result = engine.run(&record.id, request).await;
        let outcome = outcome_of(result);

        if let Err(e) = store.record_outcome(&record.id, outcome).await {
            tracing::error!("Failed to record job outcome for {}: {}", record.id, e);
        }
    });
}

fn outcome_of(result: JobResult) -> JobOutcome {
    if result.success {
        JobOutcome::Success
    } else if result.needs_otp {
        JobOutcome::NeedsOtp
    } else {
        JobOutcome::Failed(result.error.unwrap_or_else(|| "unknown".to_string()))
    }
}
