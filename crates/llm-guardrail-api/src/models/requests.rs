//! Request bodies.

use llm_guardrail_core::Direction;
use serde::Deserialize;
use validator::Validate;

/// `POST /v1/keys`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterKeyRequest {
    #[serde(default)]
    #[validate(length(max = 32))]
    pub input_validators: Vec<String>,

    #[serde(default)]
    #[validate(length(max = 32))]
    pub output_validators: Vec<String>,

    #[validate(length(min = 1, max = 128))]
    pub model_id: String,
}

/// `POST /v1/keys/delete`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteKeyRequest {
    #[validate(length(min = 1))]
    pub key_id: String,
}

/// `POST /v1/sessions/:id/validate`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ValidateTextRequest {
    pub direction: Direction,

    #[validate(length(min = 1, max = 100_000))]
    pub text: String,

    #[serde(default)]
    pub attachment: Option<String>,
}
