//! Error types for the replica
//!
//! One error enum for the whole crate, mapped onto the HTTP status codes the
//! API answers with. Handlers return `Result<Response, ReplicaError>` and the
//! router turns an `Err` into a JSON `{"error": ...}` body.

use hyper::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("Key is too long")]
    KeyTooLong,

    #[error("Value is too long")]
    ValueTooLong,

    #[error("Improperly formatted request: 'value' is missing in body")]
    MissingValue,

    #[error("Key does not exist")]
    KeyNotFound,

    #[error("Causal dependencies not satisfied; try again later")]
    CausalGap,

    #[error("View has no such replica")]
    UnknownReplica,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Failed to read request body: {0}")]
    Body(#[from] hyper::Error),

    #[error("Replication request failed: {0}")]
    Replication(#[from] reqwest::Error),
}

impl ReplicaError {
    /// HTTP status code this error is reported with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::KeyTooLong | Self::ValueTooLong | Self::MissingValue | Self::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::KeyNotFound | Self::UnknownReplica => StatusCode::NOT_FOUND,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::CausalGap => StatusCode::SERVICE_UNAVAILABLE,
            Self::Body(_) | Self::Replication(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplicaError>;
