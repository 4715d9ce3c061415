//! HTTP error mapping.
//!
//! Every failure renders as `{"error", "message", "code"}` JSON.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use llm_guardrail_core::{ErrorKind, GuardrailError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),

    #[error("Request validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed request body: {}", .0.body_text())]
    Json(#[from] JsonRejection),

    #[error("Metrics exporter not installed")]
    MetricsDisabled,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Guardrail(err) => match err.kind() {
                ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
                ErrorKind::Authorization => StatusCode::FORBIDDEN,
                ErrorKind::UnknownValidator | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Json(rejection) => rejection.status(),
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Guardrail(err) => err.code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Json(_) => "INVALID_JSON",
            Self::MetricsDisabled => "METRICS_DISABLED",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable Entity",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "Unsupported Media Type",
            StatusCode::PAYLOAD_TOO_LARGE => "Payload Too Large",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::TOO_MANY_REQUESTS => "Quota Exceeded",
            StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
            _ => "Internal Server Error",
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Guardrail(GuardrailError::Storage(_)) => "Internal storage failure".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        match &self {
            Self::Guardrail(err) if err.kind() == ErrorKind::Authentication => {
                metrics::counter!("guardrail_auth_failures_total", "code" => code).increment(1);
                tracing::debug!(code, "authentication rejected");
            }
            Self::Guardrail(GuardrailError::QuotaExceeded { .. }) => {
                metrics::counter!("guardrail_quota_rejections_total").increment(1);
            }
            Self::Guardrail(err) if status.is_server_error() => {
                tracing::error!(error = %err, code, "request failed");
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.title(),
            "message": self.public_message(),
            "code": code,
        }));
        let mut response = (status, body).into_response();

        if let Self::Guardrail(GuardrailError::QuotaExceeded { retry_after_secs }) = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
