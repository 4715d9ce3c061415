//! Sessions and their append-only validation log.
//!
//! A session is bound to exactly one credential at creation. Every read of
//! or append to its log first checks that the presented credential is the
//! one the session was created with.

use crate::credentials::{Credential, CredentialStore};
use crate::error::GuardrailError;
use crate::registry::Direction;
use crate::report::ValidationReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One validation performed within a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// Position in the session log, starting at 0.
    pub sequence: u64,
    pub direction: Direction,
    pub text: String,
    pub attachment: Option<String>,
    pub report: ValidationReport,
    pub recorded_at: DateTime<Utc>,
}

/// Record contents before the store assigns sequence and timestamp.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub direction: Direction,
    pub text: String,
    pub attachment: Option<String>,
    pub report: ValidationReport,
}

/// A session row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub credential_id: String,
    pub created_at: DateTime<Utc>,
    pub records: Vec<ValidationRecord>,
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, credential_id: &str) -> Result<Session, GuardrailError>;

    /// The credential a session is bound to, if the session exists.
    async fn credential_of(&self, session_id: &str) -> Result<Option<String>, GuardrailError>;

    /// Atomically append one record. `SessionNotFound` when absent.
    async fn append(
        &self,
        session_id: &str,
        record: NewRecord,
    ) -> Result<ValidationRecord, GuardrailError>;

    async fn records(&self, session_id: &str) -> Result<Vec<ValidationRecord>, GuardrailError>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, credential_id: &str) -> Result<Session, GuardrailError> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            credential_id: credential_id.to_string(),
            created_at: Utc::now(),
            records: Vec::new(),
        };
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn credential_of(&self, session_id: &str) -> Result<Option<String>, GuardrailError> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|s| s.credential_id.clone()))
    }

    async fn append(
        &self,
        session_id: &str,
        record: NewRecord,
    ) -> Result<ValidationRecord, GuardrailError> {
        // the shard write lock makes sequence assignment and push one step
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GuardrailError::SessionNotFound(session_id.to_string()))?;

        let stored = ValidationRecord {
            sequence: session.records.len() as u64,
            direction: record.direction,
            text: record.text,
            attachment: record.attachment,
            report: record.report,
            recorded_at: Utc::now(),
        };
        session.records.push(stored.clone());
        Ok(stored)
    }

    async fn records(&self, session_id: &str) -> Result<Vec<ValidationRecord>, GuardrailError> {
        self.sessions
            .get(session_id)
            .map(|s| s.records.clone())
            .ok_or_else(|| GuardrailError::SessionNotFound(session_id.to_string()))
    }
}

/// Creates sessions and guards access to their logs.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { store, credentials }
    }

    /// Start a session bound to the credential behind `token`.
    pub async fn start(&self, token: &str) -> Result<Session, GuardrailError> {
        let credential = self
            .credentials
            .find_by_token(token)
            .await?
            .ok_or(GuardrailError::CredentialInvalid)?;
        self.start_for(&credential).await
    }

    /// Start a session for an already-authenticated credential.
    pub async fn start_for(&self, credential: &Credential) -> Result<Session, GuardrailError> {
        let session = self.store.create(&credential.id).await?;
        tracing::info!(
            session_id = %session.id,
            credential_id = %credential.id,
            "session started"
        );
        Ok(session)
    }

    /// True only if the session exists and was created with `token`'s credential.
    pub async fn verify_ownership(
        &self,
        session_id: &str,
        token: &str,
    ) -> Result<bool, GuardrailError> {
        let Some(credential) = self.credentials.find_by_token(token).await? else {
            return Ok(false);
        };
        self.is_bound_to(session_id, &credential).await
    }

    async fn is_bound_to(
        &self,
        session_id: &str,
        credential: &Credential,
    ) -> Result<bool, GuardrailError> {
        Ok(self.store.credential_of(session_id).await?.as_deref() == Some(credential.id.as_str()))
    }

    /// Fail with `Unauthorized` unless `credential` owns the session.
    pub async fn ensure_owner(
        &self,
        session_id: &str,
        credential: &Credential,
    ) -> Result<(), GuardrailError> {
        if self.is_bound_to(session_id, credential).await? {
            return Ok(());
        }
        tracing::warn!(
            session_id,
            credential_id = %credential.id,
            "session ownership check failed"
        );
        Err(GuardrailError::Unauthorized(format!(
            "session {} is not accessible with this API key",
            session_id
        )))
    }

    /// Append one record after re-checking ownership.
    pub async fn append(
        &self,
        session_id: &str,
        credential: &Credential,
        record: NewRecord,
    ) -> Result<ValidationRecord, GuardrailError> {
        self.ensure_owner(session_id, credential).await?;
        let stored = self.store.append(session_id, record).await?;
        tracing::debug!(
            session_id,
            sequence = stored.sequence,
            direction = %stored.direction,
            passed = stored.report.validation_passed,
            "validation record appended"
        );
        Ok(stored)
    }

    /// The session's log, after an ownership check.
    pub async fn records(
        &self,
        session_id: &str,
        credential: &Credential,
    ) -> Result<Vec<ValidationRecord>, GuardrailError> {
        self.ensure_owner(session_id, credential).await?;
        self.store.records(session_id).await
    }
}
