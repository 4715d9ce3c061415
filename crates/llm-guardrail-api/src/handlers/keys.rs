//! API key management handlers (bearer-authenticated)

use crate::error::ApiError;
use crate::middleware::Owner;
use crate::models::{
    DeleteKeyRequest, DeleteKeyResponse, ListKeysResponse, RegisterKeyRequest,
    RegisterKeyResponse,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

/// POST /v1/keys
pub async fn register_key(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<RegisterKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterKeyResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let issued = state
        .engine
        .register(
            owner.as_deref(),
            request.input_validators,
            request.output_validators,
            &request.model_id,
        )
        .await?;

    tracing::info!(
        key_id = %issued.credential.id,
        prefix = %issued.credential.token_prefix,
        owner = ?owner.as_deref(),
        "API key issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterKeyResponse {
            key_id: issued.credential.id,
            api_key: issued.token,
            created_at: issued.credential.created_at,
        }),
    ))
}

/// GET /v1/keys
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> Result<Json<ListKeysResponse>, ApiError> {
    let keys = state.engine.list_keys(owner.as_deref()).await?;
    Ok(Json(ListKeysResponse { keys }))
}

/// POST /v1/keys/delete
pub async fn delete_key(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    payload: Result<Json<DeleteKeyRequest>, JsonRejection>,
) -> Result<Json<DeleteKeyResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;
    state
        .engine
        .delete_key(&request.key_id, owner.as_deref())
        .await?;

    tracing::info!(key_id = %request.key_id, owner = ?owner.as_deref(), "API key deleted");
    Ok(Json(DeleteKeyResponse {
        deleted: true,
        key_id: request.key_id,
    }))
}
