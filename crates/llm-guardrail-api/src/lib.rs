//! # LLM-Guardrail-API
//!
//! HTTP surface for the guardrail engine: API key management behind bearer
//! tokens, and session-scoped validation behind `X-API-Key`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use router::{create_router, create_router_with_config};
pub use state::AppState;
