//! Error types for key and revocation sources.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while fetching issuer data.
///
/// None of these are retried here; retry policy belongs to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The transport could not reach the issuer.
    #[error("transport failure for {issuer}: {reason}")]
    TransportFailure { issuer: String, reason: String },

    /// The fetch did not finish within the caller's timeout.
    #[error("fetch from {issuer} timed out after {timeout:?}")]
    Timeout { issuer: String, timeout: Duration },

    /// The issuer publishes no key set.
    #[error("issuer not found: {0}")]
    IssuerNotFound(String),

    /// The fetched document is unusable.
    #[error("invalid document from {issuer}: {reason}")]
    InvalidDocument { issuer: String, reason: String },
}

impl DirectoryError {
    /// Stable machine-readable code for detailed verification records.
    pub fn code(&self) -> &'static str {
        match self {
            DirectoryError::TransportFailure { .. } => "transport_failure",
            DirectoryError::Timeout { .. } => "timeout",
            DirectoryError::IssuerNotFound(_) => "issuer_not_found",
            DirectoryError::InvalidDocument { .. } => "invalid_document",
        }
    }
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
