//! Session and validation handlers (API-key-authenticated)

use crate::error::ApiError;
use crate::middleware::ApiKey;
use crate::models::{SessionRecordsResponse, StartSessionResponse, ValidateTextRequest};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use llm_guardrail_core::{ValidateRequest, ValidationReport};
use validator::Validate;

/// POST /v1/sessions
pub async fn start_session(
    State(state): State<AppState>,
    api_key: ApiKey,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let session = state.engine.start_session(api_key.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id: session.id,
            created_at: session.created_at,
        }),
    ))
}

/// POST /v1/sessions/:id/validate
///
/// The API key is checked before the body, so unauthenticated callers get 401
/// whatever they send.
pub async fn validate_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    api_key: ApiKey,
    payload: Result<Json<ValidateTextRequest>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    state.engine.authenticate(api_key.as_deref()).await?;
    let Json(request) = payload?;
    request.validate()?;
    let direction = request.direction;

    let report = state
        .engine
        .validate(
            api_key.as_deref(),
            ValidateRequest {
                session_id,
                direction,
                text: request.text,
                attachment: request.attachment,
            },
        )
        .await?;

    let passed = if report.validation_passed { "true" } else { "false" };
    metrics::counter!(
        "guardrail_validations_total",
        "direction" => direction.as_str(),
        "passed" => passed
    )
    .increment(1);

    Ok(Json(report))
}

/// GET /v1/sessions/:id/records
pub async fn session_records(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    api_key: ApiKey,
) -> Result<Json<SessionRecordsResponse>, ApiError> {
    let records = state
        .engine
        .session_records(api_key.as_deref(), &session_id)
        .await?;
    Ok(Json(SessionRecordsResponse {
        session_id,
        records,
    }))
}
