//! Opaque API-key verification.

use crate::credentials::{Credential, CredentialStore};
use crate::error::GuardrailError;
use std::sync::Arc;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Resolves presented API keys to credentials.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    credentials: Arc<dyn CredentialStore>,
}

impl ApiKeyAuthenticator {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    /// `CredentialMissing` when no key was presented, `CredentialInvalid`
    /// when it does not resolve.
    pub async fn authenticate(&self, presented: Option<&str>) -> Result<Credential, GuardrailError> {
        let token = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GuardrailError::CredentialMissing)?;

        self.credentials
            .find_by_token(token)
            .await?
            .ok_or(GuardrailError::CredentialInvalid)
    }
}
