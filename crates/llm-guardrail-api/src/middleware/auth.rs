//! Authentication for the two route families.
//!
//! Management routes carry `Authorization: Bearer <jwt>`; the verified `sub`
//! claim becomes the [`Owner`] of keys created or listed. Without a configured
//! key set the middleware is a pass-through and every caller is the single
//! tenant (`Owner(None)`).
//!
//! Validation routes carry `X-API-Key`; the [`ApiKey`] extractor hands the raw
//! value to the engine, which resolves it against the credential store.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use llm_guardrail_core::auth::api_key::API_KEY_HEADER;
use llm_guardrail_core::GuardrailError;
use std::convert::Infallible;

/// Identity that owns the credentials a management call touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub Option<String>);

impl Owner {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Bearer-token middleware for management routes.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(verifier) = state.bearer.as_ref() else {
        request.extensions_mut().insert(Owner(None));
        return next.run(request).await;
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_credentials);

    let Some(token) = token else {
        return ApiError::from(GuardrailError::TokenInvalid(
            "missing bearer token".to_string(),
        ))
        .into_response();
    };

    match verifier.verify(token).await {
        Ok(claims) => {
            tracing::debug!(owner = %claims.sub, "bearer token accepted");
            request.extensions_mut().insert(Owner(Some(claims.sub)));
            next.run(request).await
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Token from an `Authorization` value; the scheme name is case-insensitive.
fn bearer_credentials(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Raw `X-API-Key` header value, if present.
#[derive(Debug, Clone)]
pub struct ApiKey(pub Option<String>);

impl ApiKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ApiKey(
            parts
                .headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        ))
    }
}
