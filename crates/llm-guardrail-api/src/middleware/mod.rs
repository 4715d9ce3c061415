//! Middleware layers
//!
//! ## Available Middleware
//!
//! - `auth`: bearer-token verification for key management, `X-API-Key`
//!   extraction for validation routes

pub mod auth;

// Re-exports
pub use auth::{bearer_auth_middleware, ApiKey, Owner};
