//! # LLM-Guardrail-Core
//!
//! Validation orchestration and session-scoped authorization for LLM
//! guardrails.
//!
//! ## Overview
//!
//! Tenants register API keys that carry an ordered selection of input and
//! output validators. Validation calls run the selection as a pipeline against
//! the submitted text and append the normalized report to a session log that
//! only the owning key can read or extend.
//!
//! - **Registry**: named checks per direction, with a failure policy each
//! - **Pipeline**: ordered execution with fix / reask / exception semantics
//! - **Normalizer**: total mapping from raw outcomes to [`ValidationReport`]
//! - **Credentials & sessions**: opaque keys, append-only audit logs
//! - **Auth & quota**: bearer-token verification for management calls, API
//!   keys and a per-credential ceiling for validation calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use llm_guardrail_core::{Direction, GuardrailEngine, ValidateRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = GuardrailEngine::builder().build();
//!
//!     let issued = engine
//!         .register(None, vec!["detect_pii".into()], vec![], "gpt-4o")
//!         .await?;
//!     let session = engine.start_session(Some(&issued.token)).await?;
//!
//!     let report = engine
//!         .validate(
//!             Some(&issued.token),
//!             ValidateRequest {
//!                 session_id: session.id,
//!                 direction: Direction::Input,
//!                 text: "My SSN is 123-45-6789".into(),
//!                 attachment: None,
//!             },
//!         )
//!         .await?;
//!     println!("passed: {}", report.validation_passed);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod checks;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod quota;
pub mod registry;
pub mod report;
pub mod sessions;

// Primary exports
pub use config::{CoreConfig, EmptySelection};
pub use credentials::{Credential, CredentialStore, InMemoryCredentialStore, IssuedCredential};
pub use engine::{GuardrailEngine, GuardrailEngineBuilder, KeySummary, ValidateRequest};
pub use error::{ErrorKind, GuardrailError};
pub use pipeline::{GuardComposer, Pipeline};
pub use quota::QuotaGuard;
pub use registry::{Direction, FailurePolicy, ValidatorDescriptor, ValidatorRegistry};
pub use report::{CheckStatus, CheckSummary, ErrorSpan, ValidationReport};
pub use sessions::{Session, SessionManager, SessionStore, ValidationRecord};
