//! Authentication front.
//!
//! Two schemes, selected by call type:
//! - **Bearer tokens** (management operations): externally issued JWTs,
//!   verified against the issuer's published key set. See [`bearer`].
//! - **API keys** (validation and session operations): opaque tokens
//!   resolved through the [`crate::credentials::CredentialStore`]. See [`api_key`].

pub mod api_key;
pub mod bearer;

pub use api_key::ApiKeyAuthenticator;
pub use bearer::{BearerVerifier, CachedKeySet, Claims, HttpKeySetSource, KeySetSource};
