//! Error types for LLM-Guardrail-Core.

use crate::registry::Direction;

/// Coarse error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, invalid or expired credential or bearer token.
    Authentication,
    /// Session or credential ownership mismatch.
    Authorization,
    /// Validator selection references something the registry cannot resolve.
    UnknownValidator,
    /// Per-credential request ceiling reached.
    QuotaExceeded,
    /// Key-set fetch or external check failure. Retryable by the caller.
    UpstreamUnavailable,
    /// Persistence failure.
    Storage,
    /// Addressed resource does not exist.
    NotFound,
    /// Malformed request input.
    InvalidInput,
}

/// Errors that can occur in the guardrail engine.
#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
    /// No API key was presented.
    #[error("API key missing")]
    CredentialMissing,

    /// The presented API key does not resolve to a credential.
    #[error("Invalid API key")]
    CredentialInvalid,

    /// Bearer token is past its expiry.
    #[error("Bearer token expired")]
    TokenExpired,

    /// Bearer token failed signature, issuer, audience or format checks.
    #[error("Invalid bearer token: {0}")]
    TokenInvalid(String),

    /// The issuer's public key set could not be fetched.
    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// The caller does not own the addressed session.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Validator name not registered for the direction.
    #[error("Unknown {direction} validator: {name}")]
    UnknownValidator { name: String, direction: Direction },

    /// Configured parameters are not accepted by the validator's check.
    #[error("Invalid params for {direction} validator {name}: {reason}")]
    InvalidValidatorParams {
        name: String,
        direction: Direction,
        reason: String,
    },

    /// The credential selected no validators for the direction.
    #[error("No {0} validators selected")]
    EmptySelection(Direction),

    /// Request ceiling reached for the current window.
    #[error("Quota exceeded, retry after {retry_after_secs}s")]
    QuotaExceeded { retry_after_secs: u64 },

    /// A check failed to execute (as opposed to the text failing the check).
    #[error("Validator {validator} unavailable: {reason}")]
    CheckUnavailable { validator: String, reason: String },

    /// Session identifier does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Credential does not exist or is not owned by the requester.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Request input rejected before reaching the engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GuardrailError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CredentialMissing
            | Self::CredentialInvalid
            | Self::TokenExpired
            | Self::TokenInvalid(_) => ErrorKind::Authentication,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::UnknownValidator { .. }
            | Self::InvalidValidatorParams { .. }
            | Self::EmptySelection(_) => ErrorKind::UnknownValidator,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::KeySetUnavailable(_) | Self::CheckUnavailable { .. } => {
                ErrorKind::UpstreamUnavailable
            }
            Self::SessionNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
            Self::InvalidRequest(_) => ErrorKind::InvalidInput,
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::UpstreamUnavailable
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "CREDENTIAL_MISSING",
            Self::CredentialInvalid => "CREDENTIAL_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenInvalid(_) => "TOKEN_INVALID",
            Self::KeySetUnavailable(_) => "KEY_SET_UNAVAILABLE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::UnknownValidator { .. } => "UNKNOWN_VALIDATOR",
            Self::InvalidValidatorParams { .. } => "INVALID_VALIDATOR_PARAMS",
            Self::EmptySelection(_) => "EMPTY_VALIDATOR_SELECTION",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::CheckUnavailable { .. } => "CHECK_UNAVAILABLE",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}
