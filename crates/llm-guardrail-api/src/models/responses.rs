//! Response bodies.

use chrono::{DateTime, Utc};
use llm_guardrail_core::{FailurePolicy, KeySummary, ValidationRecord};
use serde::{Deserialize, Serialize};

/// One-time disclosure of a newly issued API key.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterKeyResponse {
    pub key_id: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListKeysResponse {
    pub keys: Vec<KeySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteKeyResponse {
    pub deleted: bool,
    pub key_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRecordsResponse {
    pub session_id: String,
    pub records: Vec<ValidationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub name: String,
    pub on_fail: FailurePolicy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatorCatalogResponse {
    pub input: Vec<ValidatorInfo>,
    pub output: Vec<ValidatorInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}
