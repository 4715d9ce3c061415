//! GuardrailEngine - entry point for credential management and validation.
//!
//! A validation request flows:
//! API key → session ownership → quota → pipeline composition → checks →
//! normalization → append to the session log.
//!
//! No lock is held while checks run: ownership is checked up front and again
//! when the record is appended.

use crate::auth::ApiKeyAuthenticator;
use crate::config::{CoreConfig, EmptySelection, QuotaConfig};
use crate::credentials::{
    Credential, CredentialStore, InMemoryCredentialStore, IssuedCredential, NewCredential,
    TokenIndex,
};
use crate::error::{ErrorKind, GuardrailError};
use crate::normalizer::normalize;
use crate::pipeline::GuardComposer;
use crate::quota::QuotaGuard;
use crate::registry::{Direction, ValidatorRegistry};
use crate::report::ValidationReport;
use crate::sessions::{
    InMemorySessionStore, NewRecord, Session, SessionManager, SessionStore, ValidationRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Listing view of a credential. Carries only the token's display prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySummary {
    pub key_id: String,
    pub api_key_prefix: String,
    pub input_validators: Vec<String>,
    pub output_validators: Vec<String>,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for KeySummary {
    fn from(c: Credential) -> Self {
        Self {
            key_id: c.id,
            api_key_prefix: c.token_prefix,
            input_validators: c.input_validators,
            output_validators: c.output_validators,
            model_id: c.model_id,
            created_at: c.created_at,
        }
    }
}

/// A single validation call.
#[derive(Debug, Clone)]
pub struct ValidateRequest {
    pub session_id: String,
    pub direction: Direction,
    pub text: String,
    pub attachment: Option<String>,
}

/// Validation orchestration and session-scoped authorization.
pub struct GuardrailEngine {
    composer: GuardComposer,
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionManager,
    api_keys: ApiKeyAuthenticator,
    quota: QuotaGuard,
}

impl GuardrailEngine {
    pub fn builder() -> GuardrailEngineBuilder {
        GuardrailEngineBuilder::new()
    }

    /// Engine with in-memory stores configured from `config`.
    pub fn from_config(config: &CoreConfig) -> Result<Self, GuardrailError> {
        let registry = ValidatorRegistry::from_config(&config.validators)?;
        let index = match &config.credentials.token_pepper {
            Some(pepper) => TokenIndex::new(pepper.as_bytes()),
            None => {
                tracing::warn!("no token pepper configured; API keys will not survive a restart");
                TokenIndex::ephemeral()
            }
        };

        Ok(Self::builder()
            .with_registry(Arc::new(registry))
            .with_empty_selection(config.validators.empty_selection)
            .with_credential_store(Arc::new(InMemoryCredentialStore::new(index)))
            .with_quota(QuotaGuard::from_config(&config.quota))
            .build())
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        self.composer.registry()
    }

    /// Issue a credential. The returned token is the only full disclosure.
    pub async fn register(
        &self,
        owner: Option<&str>,
        input_validators: Vec<String>,
        output_validators: Vec<String>,
        model_id: &str,
    ) -> Result<IssuedCredential, GuardrailError> {
        if model_id.trim().is_empty() {
            return Err(GuardrailError::InvalidRequest(
                "model_id must not be empty".to_string(),
            ));
        }
        let registry = self.registry();
        registry.validate_names(Direction::Input, &input_validators)?;
        registry.validate_names(Direction::Output, &output_validators)?;

        self.credentials
            .issue(NewCredential {
                owner: owner.map(str::to_string),
                input_validators,
                output_validators,
                model_id: model_id.to_string(),
            })
            .await
    }

    pub async fn list_keys(&self, owner: Option<&str>) -> Result<Vec<KeySummary>, GuardrailError> {
        Ok(self
            .credentials
            .find_by_owner(owner)
            .await?
            .into_iter()
            .map(KeySummary::from)
            .collect())
    }

    pub async fn delete_key(&self, key_id: &str, owner: Option<&str>) -> Result<(), GuardrailError> {
        self.credentials.delete(key_id, owner).await
    }

    /// Resolve a presented API key.
    pub async fn authenticate(&self, api_key: Option<&str>) -> Result<Credential, GuardrailError> {
        self.api_keys.authenticate(api_key).await
    }

    pub async fn start_session(&self, api_key: Option<&str>) -> Result<Session, GuardrailError> {
        let credential = self.authenticate(api_key).await?;
        self.sessions.start_for(&credential).await
    }

    /// Validate text within a session and append the result to its log.
    pub async fn validate(
        &self,
        api_key: Option<&str>,
        request: ValidateRequest,
    ) -> Result<ValidationReport, GuardrailError> {
        let credential = self.authenticate(api_key).await?;
        self.sessions
            .ensure_owner(&request.session_id, &credential)
            .await?;
        self.quota.check_and_consume(&credential.id)?;

        let report = self.run_checks(&credential, request.direction, &request.text).await?;

        self.sessions
            .append(
                &request.session_id,
                &credential,
                NewRecord {
                    direction: request.direction,
                    text: request.text,
                    attachment: request.attachment,
                    report: report.clone(),
                },
            )
            .await?;

        tracing::info!(
            session_id = %request.session_id,
            credential_id = %credential.id,
            direction = %request.direction,
            passed = report.validation_passed,
            checks = report.validation_summaries.len(),
            "validation completed"
        );
        Ok(report)
    }

    /// Compose and run the credential's pipeline. A selection the registry
    /// cannot resolve yields an empty failed report instead of an error.
    async fn run_checks(
        &self,
        credential: &Credential,
        direction: Direction,
        text: &str,
    ) -> Result<ValidationReport, GuardrailError> {
        let names = match direction {
            Direction::Input => &credential.input_validators,
            Direction::Output => &credential.output_validators,
        };

        match self.composer.compose(direction, names) {
            Ok(pipeline) => {
                let raw = pipeline.run(text).await?;
                Ok(normalize(Some(&raw)))
            }
            Err(e) if e.kind() == ErrorKind::UnknownValidator => {
                tracing::warn!(
                    credential_id = %credential.id,
                    %direction,
                    error = %e,
                    "validator selection unresolvable, returning empty report"
                );
                Ok(ValidationReport::empty_failed(Some(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    /// The session's audit log, readable only with the owning API key.
    pub async fn session_records(
        &self,
        api_key: Option<&str>,
        session_id: &str,
    ) -> Result<Vec<ValidationRecord>, GuardrailError> {
        let credential = self.authenticate(api_key).await?;
        self.sessions.records(session_id, &credential).await
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn quota(&self) -> &QuotaGuard {
        &self.quota
    }
}

/// Builder for custom engine wiring (stores, registry, quota).
pub struct GuardrailEngineBuilder {
    registry: Option<Arc<ValidatorRegistry>>,
    empty_selection: EmptySelection,
    credentials: Option<Arc<dyn CredentialStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
    quota: Option<QuotaGuard>,
}

impl GuardrailEngineBuilder {
    fn new() -> Self {
        Self {
            registry: None,
            empty_selection: EmptySelection::default(),
            credentials: None,
            sessions: None,
            quota: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<ValidatorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_empty_selection(mut self, policy: EmptySelection) -> Self {
        self.empty_selection = policy;
        self
    }

    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn with_quota(mut self, quota: QuotaGuard) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn build(self) -> GuardrailEngine {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ValidatorRegistry::builtin()));
        let credentials: Arc<dyn CredentialStore> = self
            .credentials
            .unwrap_or_else(|| Arc::new(InMemoryCredentialStore::default()));
        let sessions: Arc<dyn SessionStore> = self
            .sessions
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));

        GuardrailEngine {
            composer: GuardComposer::new(registry, self.empty_selection),
            sessions: SessionManager::new(sessions, credentials.clone()),
            api_keys: ApiKeyAuthenticator::new(credentials.clone()),
            credentials,
            quota: self
                .quota
                .unwrap_or_else(|| QuotaGuard::from_config(&QuotaConfig::default())),
        }
    }
}
