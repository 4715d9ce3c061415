//! HTTP request handlers

pub mod health;
pub mod keys;
pub mod sessions;
pub mod validators;

pub use health::{health, live, metrics, ready, version};
pub use keys::{delete_key, list_keys, register_key};
pub use sessions::{session_records, start_session, validate_text};
pub use validators::list_validators;
