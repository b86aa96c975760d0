//! Error types for the HAP API.

use hap_core::{CoreError, Stage, VerifyError};
use hap_directory::DirectoryError;
use thiserror::Error;

/// Errors that can occur while issuing or verifying claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HapError {
    /// Building or encoding a claim failed.
    #[error("claim error: {0}")]
    Core(#[from] CoreError),

    /// The claim was rejected.
    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Issuer data could not be fetched.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// An authority was asked to sign a claim naming another issuer.
    #[error("authority for '{authority}' cannot sign a claim issued by '{claim}'")]
    ForeignIssuer { authority: String, claim: String },
}

impl HapError {
    /// The verification stage this error belongs to, if any. Directory
    /// failures count as key resolution.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            HapError::Verify(e) => Some(e.stage()),
            HapError::Directory(_) => Some(Stage::KeyResolution),
            HapError::Core(_) | HapError::ForeignIssuer { .. } => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            HapError::Verify(e) => e.code(),
            HapError::Directory(e) => e.code(),
            HapError::Core(_) => "invalid_claim",
            HapError::ForeignIssuer { .. } => "foreign_issuer",
        }
    }
}

/// Result type for HAP operations.
pub type Result<T> = std::result::Result<T, HapError>;
