//! Configuration types for the core engine.
//!
//! These are plain serde structures; loading them from files or the
//! environment is left to the host binary.

use crate::checks::CheckParams;
use crate::registry::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_QUOTA_LIMIT: u64 = 1000;
const DEFAULT_QUOTA_WINDOW_SECS: u64 = 86_400;
const DEFAULT_JWKS_TTL_SECS: u64 = 300;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub quota: QuotaConfig,
    pub auth: AuthConfig,
    pub credentials: CredentialsConfig,
    pub validators: RegistryConfig,
}

/// Per-credential request ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Requests allowed per window. Zero disables the guard.
    pub limit: u64,
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUOTA_LIMIT,
            window_secs: DEFAULT_QUOTA_WINDOW_SECS,
        }
    }
}

/// Bearer-token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer key-set URL. Unset means single-tenant mode (no owner claim).
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub jwks_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks_url: None,
            issuer: None,
            audience: None,
            jwks_ttl_secs: DEFAULT_JWKS_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }
}

/// Credential store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// HMAC key for the token index. Generated per process when unset.
    pub token_pepper: Option<String>,
}

/// What composing an empty validator selection does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    /// Fail with `EmptySelection`.
    #[default]
    Reject,
    /// Run every registered validator for the direction.
    RunAll,
}

/// Per-validator overrides applied on top of the built-in catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOverride {
    pub on_fail: Option<FailurePolicy>,
    pub params: CheckParams,
}

/// Validator catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub empty_selection: EmptySelection,
    pub input: HashMap<String, ValidatorOverride>,
    pub output: HashMap<String, ValidatorOverride>,
}
