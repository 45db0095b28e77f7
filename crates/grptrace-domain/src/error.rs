//! Domain error types for membership tracing.

use thiserror::Error;

/// Domain-specific errors for membership tracing.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The directory could not answer a lookup (network or protocol failure).
    #[error("directory unavailable: {message}")]
    DirectoryUnavailable { message: String },

    /// A lookup for one sub-branch of a trace failed.
    ///
    /// The resolver contains these: the branch contributes no sub-trace and
    /// the overall trace still completes.
    #[error("lookup failed for branch '{group_name}': {message}")]
    BranchLookupFailed { group_name: String, message: String },

    /// Invalid subject identifier.
    #[error("invalid subject id: '{value}'")]
    InvalidSubject { value: String },

    /// Invalid group name.
    #[error("invalid group name: '{value}'")]
    InvalidGroupName { value: String },

    /// Timeout during a trace.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The caller cancelled the trace.
    #[error("trace cancelled")]
    Cancelled,
}

impl DomainError {
    /// Wraps a lookup failure for a specific branch of the trace.
    pub fn branch(group_name: impl Into<String>, source: &DomainError) -> Self {
        Self::BranchLookupFailed {
            group_name: group_name.into(),
            message: source.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
