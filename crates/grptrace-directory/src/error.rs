//! Directory error types.

use grptrace_domain::DomainError;
use thiserror::Error;

/// Directory backend errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory answered with a non-success status.
    #[error("directory API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("directory transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response that could not be understood.
    #[error("invalid directory response: {message}")]
    InvalidResponse { message: String },

    /// Group not present in the directory.
    #[error("group not found: {group_name}")]
    GroupNotFound { group_name: String },

    /// Composite groups take their members from their factors only.
    #[error("composite group {group_name} cannot have direct members")]
    CompositeMembership { group_name: String },

    /// Fixture could not be read or is inconsistent.
    #[error("fixture error: {message}")]
    Fixture { message: String },

    /// Client misconfiguration.
    #[error("invalid directory configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl From<DirectoryError> for DomainError {
    fn from(err: DirectoryError) -> Self {
        DomainError::DirectoryUnavailable {
            message: err.to_string(),
        }
    }
}
