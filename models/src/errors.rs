// models/src/errors.rs
use serde::{Deserialize, Serialize};
pub use thiserror::Error;

/// Error taxonomy shared by every crate in the workspace.
///
/// Variants map one-to-one onto HTTP status codes at the API boundary:
/// Validation -> 422, Unauthorized -> 401, Forbidden -> 403,
/// NotFound -> 404, Conflict -> 409, Storage/Internal -> 500.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        ApiError::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    /// Client-facing detail string. Storage failures are collapsed to a
    /// generic message so internal paths never leak to the client.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Storage(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn should_hide_storage_detail_from_clients() {
        let err = ApiError::storage("disk full at /var/uploads/ab12");
        assert_eq!(err.detail(), "Internal server error");
    }

    #[test]
    fn should_keep_client_error_detail() {
        let err = ApiError::forbidden("You cannot delete this file");
        assert_eq!(err.detail(), "Forbidden: You cannot delete this file");
    }
}
