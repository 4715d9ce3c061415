//! API key issuance and lookup.
//!
//! Tokens are shown to the caller exactly once, at issuance. Stores keep an
//! HMAC-SHA256 digest of the token (keyed with a server-side pepper) as the
//! unique lookup index, plus a short display prefix for listings.

use crate::error::GuardrailError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Prefix marking guardrail API keys.
pub const TOKEN_PREFIX: &str = "grd_";
/// Characters of the token kept for display.
pub const DISPLAY_PREFIX_LEN: usize = 8;
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// A stored API key record. Never carries the token itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    /// External identity claim (`sub`); `None` in single-tenant deployments.
    pub owner: Option<String>,
    pub token_prefix: String,
    pub input_validators: Vec<String>,
    pub output_validators: Vec<String>,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of issuance: the only place the full token is exposed.
#[derive(Clone)]
pub struct IssuedCredential {
    pub credential: Credential,
    pub token: String,
}

impl fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("credential", &self.credential)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Issuance request.
#[derive(Debug, Clone, Default)]
pub struct NewCredential {
    pub owner: Option<String>,
    pub input_validators: Vec<String>,
    pub output_validators: Vec<String>,
    pub model_id: String,
}

/// Identity & credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Generate a fresh token and persist the record.
    async fn issue(&self, request: NewCredential) -> Result<IssuedCredential, GuardrailError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Credential>, GuardrailError>;

    /// Credentials owned by `owner`, oldest first.
    async fn find_by_owner(&self, owner: Option<&str>) -> Result<Vec<Credential>, GuardrailError>;

    /// Hard delete. `NotFound` when absent or owned by someone else.
    async fn delete(
        &self,
        credential_id: &str,
        requesting_owner: Option<&str>,
    ) -> Result<(), GuardrailError>;
}

/// Source of new token strings.
pub type TokenGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// `grd_` followed by 128 bits from the OS RNG in base62.
pub fn generate_token() -> String {
    let value: u128 = OsRng.gen();
    format!("{}{:0>22}", TOKEN_PREFIX, base62::encode(value))
}

pub fn display_prefix(token: &str) -> String {
    token.chars().take(DISPLAY_PREFIX_LEN).collect()
}

/// Keyed digest used as the token index.
#[derive(Clone)]
pub struct TokenIndex {
    key: Vec<u8>,
}

impl TokenIndex {
    pub fn new(pepper: &[u8]) -> Self {
        Self {
            key: pepper.to_vec(),
        }
    }

    /// Index keyed with 32 random bytes. Digests do not survive a restart.
    pub fn ephemeral() -> Self {
        let mut key = vec![0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn digest(&self, token: &str) -> Result<String, GuardrailError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| GuardrailError::Storage(format!("HMAC error: {}", e)))?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for TokenIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenIndex(..)")
    }
}

#[derive(Debug, Clone)]
struct StoredCredential {
    credential: Credential,
    token_digest: String,
    seq: u64,
}

/// Process-local credential store.
pub struct InMemoryCredentialStore {
    rows: DashMap<String, StoredCredential>,
    by_token: DashMap<String, String>,
    index: TokenIndex,
    generator: TokenGenerator,
    seq: AtomicU64,
}

impl InMemoryCredentialStore {
    pub fn new(index: TokenIndex) -> Self {
        Self {
            rows: DashMap::new(),
            by_token: DashMap::new(),
            index,
            generator: Arc::new(generate_token),
            seq: AtomicU64::new(0),
        }
    }

    /// Replace the token source.
    pub fn with_generator(mut self, generator: TokenGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new(TokenIndex::ephemeral())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn issue(&self, request: NewCredential) -> Result<IssuedCredential, GuardrailError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = (self.generator)();
            let digest = self.index.digest(&token)?;
            let id = uuid::Uuid::new_v4().to_string();

            match self.by_token.entry(digest.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!(attempt, "token collision on issue, regenerating");
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                }
            }

            let credential = Credential {
                id: id.clone(),
                owner: request.owner,
                token_prefix: display_prefix(&token),
                input_validators: request.input_validators,
                output_validators: request.output_validators,
                model_id: request.model_id,
                created_at: Utc::now(),
            };
            self.rows.insert(
                id,
                StoredCredential {
                    credential: credential.clone(),
                    token_digest: digest,
                    seq: self.seq.fetch_add(1, Ordering::Relaxed),
                },
            );

            tracing::info!(
                credential_id = %credential.id,
                token_prefix = %credential.token_prefix,
                "credential issued"
            );
            return Ok(IssuedCredential { credential, token });
        }

        Err(GuardrailError::Storage(format!(
            "could not generate a unique token after {} attempts",
            MAX_ISSUE_ATTEMPTS
        )))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Credential>, GuardrailError> {
        let digest = self.index.digest(token)?;
        let Some(id) = self.by_token.get(&digest).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        Ok(self.rows.get(&id).map(|row| row.credential.clone()))
    }

    async fn find_by_owner(&self, owner: Option<&str>) -> Result<Vec<Credential>, GuardrailError> {
        let mut rows: Vec<(u64, Credential)> = self
            .rows
            .iter()
            .filter(|row| row.credential.owner.as_deref() == owner)
            .map(|row| (row.seq, row.credential.clone()))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, c)| c).collect())
    }

    async fn delete(
        &self,
        credential_id: &str,
        requesting_owner: Option<&str>,
    ) -> Result<(), GuardrailError> {
        let removed = self.rows.remove_if(credential_id, |_, row| {
            row.credential.owner.as_deref() == requesting_owner
        });

        match removed {
            Some((_, row)) => {
                self.by_token.remove(&row.token_digest);
                tracing::info!(credential_id, "credential deleted");
                Ok(())
            }
            None => Err(GuardrailError::NotFound(format!(
                "credential {}",
                credential_id
            ))),
        }
    }
}
