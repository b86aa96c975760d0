//! Error types for HAP core operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::verify::RevocationReason;

/// Structural errors raised while building, encoding or decoding claims.
///
/// None of these involve key material; they are raised before any
/// signature work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("malformed claim id: {0}")]
    MalformedId(String),

    #[error("malformed compact claim: {0}")]
    MalformedCompact(String),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("malformed JWS: {0}")]
    MalformedJws(String),

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The verification stage at which a claim was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Parsing the envelope, the claim body and the id.
    Structure,
    /// Looking up the signing key by `kid`.
    KeyResolution,
    /// Ed25519 signature check over the canonical payload.
    Signature,
    /// Claim issuer against the domain the keys came from.
    Issuer,
    /// `expires_at` against the verification clock.
    Expiry,
    /// Caller-supplied revocation status.
    Revocation,
}

impl Stage {
    /// Stable lowercase name, used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Structure => "structure",
            Stage::KeyResolution => "key_resolution",
            Stage::Signature => "signature",
            Stage::Issuer => "issuer",
            Stage::Expiry => "expiry",
            Stage::Revocation => "revocation",
        }
    }
}

/// Reasons a claim fails verification.
///
/// Variants are ordered by the stage that produces them. All of them are
/// terminal: nothing here is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("malformed claim id: {0}")]
    MalformedId(String),

    #[error("malformed compact claim: {0}")]
    MalformedCompact(String),

    #[error("malformed JWS: {0}")]
    MalformedJws(String),

    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("test claim {0} rejected")]
    TestClaim(String),

    #[error("no key with kid '{kid}' in the issuer key set")]
    KeyNotFound { kid: String },

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("issuer mismatch: keys fetched for '{expected}' but claim names '{actual}'")]
    IssuerMismatch { expected: String, actual: String },

    #[error("claim expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("claim revoked ({})", .reason.map(RevocationReason::as_str).unwrap_or("unspecified"))]
    Revoked {
        reason: Option<RevocationReason>,
        revoked_at: Option<DateTime<Utc>>,
    },
}

impl VerifyError {
    /// The first stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            VerifyError::MalformedId(_)
            | VerifyError::MalformedCompact(_)
            | VerifyError::MalformedJws(_)
            | VerifyError::MalformedClaim(_)
            | VerifyError::UnsupportedVersion(_)
            | VerifyError::TestClaim(_) => Stage::Structure,
            VerifyError::KeyNotFound { .. } => Stage::KeyResolution,
            VerifyError::SignatureInvalid => Stage::Signature,
            VerifyError::IssuerMismatch { .. } => Stage::Issuer,
            VerifyError::Expired { .. } => Stage::Expiry,
            VerifyError::Revoked { .. } => Stage::Revocation,
        }
    }

    /// Stable machine-readable code for detailed verification records.
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::MalformedId(_) => "malformed_id",
            VerifyError::MalformedCompact(_) => "malformed_compact",
            VerifyError::MalformedJws(_) => "malformed_jws",
            VerifyError::MalformedClaim(_) => "malformed_claim",
            VerifyError::UnsupportedVersion(_) => "unsupported_version",
            VerifyError::TestClaim(_) => "test_claim",
            VerifyError::KeyNotFound { .. } => "key_not_found",
            VerifyError::SignatureInvalid => "signature_invalid",
            VerifyError::IssuerMismatch { .. } => "issuer_mismatch",
            VerifyError::Expired { .. } => "expired",
            VerifyError::Revoked { .. } => "revoked",
        }
    }

    /// True for failures detected before any key material was touched.
    pub fn is_structural(&self) -> bool {
        self.stage() == Stage::Structure
    }
}

impl From<CoreError> for VerifyError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MalformedId(msg) => VerifyError::MalformedId(msg),
            CoreError::MalformedCompact(msg) => VerifyError::MalformedCompact(msg),
            CoreError::UnsupportedVersion(msg) => VerifyError::UnsupportedVersion(msg),
            CoreError::MalformedJws(msg) => VerifyError::MalformedJws(msg),
            CoreError::InvalidClaim(msg)
            | CoreError::InvalidTimestamp(msg)
            | CoreError::Encoding(msg) => VerifyError::MalformedClaim(msg),
            CoreError::InvalidPublicKey | CoreError::InvalidSignature => {
                VerifyError::SignatureInvalid
            }
        }
    }
}
