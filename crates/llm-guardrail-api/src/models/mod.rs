//! Request and response types

pub mod requests;
pub mod responses;

pub use requests::{DeleteKeyRequest, RegisterKeyRequest, ValidateTextRequest};
pub use responses::{
    DeleteKeyResponse, HealthResponse, ListKeysResponse, RegisterKeyResponse,
    SessionRecordsResponse, StartSessionResponse, ValidatorCatalogResponse, ValidatorInfo,
    VersionResponse,
};
