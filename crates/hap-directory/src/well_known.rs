//! Published document locations and records.
//!
//! An issuer publishes its key set at `https://<issuer>/.well-known/hap.json`
//! and answers per-claim lookups at `https://<issuer>/api/v1/verify/<id>`.
//! This module builds those URLs and models the verification API response.
//! Fetching them is up to a [`KeySource`](crate::KeySource) implementation.

use chrono::{DateTime, Utc};
use hap_core::{Claim, ClaimId, RevocationReason, RevocationStatus, WellKnownKeySet};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, Result};

/// Path of the key set document, relative to the issuer origin.
pub const WELL_KNOWN_PATH: &str = "/.well-known/hap.json";

/// Path prefix of the per-claim verification API.
pub const VERIFY_API_PATH: &str = "/api/v1/verify/";

/// `https://<issuer>/.well-known/hap.json`
pub fn well_known_url(issuer: &str) -> String {
    format!("https://{issuer}{WELL_KNOWN_PATH}")
}

/// `https://<issuer>/api/v1/verify/<id>`
pub fn verify_api_url(issuer: &str, id: &ClaimId) -> String {
    format!("https://{issuer}{VERIFY_API_PATH}{id}")
}

/// Check that a key set fetched for `issuer` declares that issuer.
///
/// A document served from one domain but naming another is refused, so
/// that issuer binding cannot be side-stepped by a misconfigured mirror.
pub fn validate_key_set(issuer: &str, key_set: &WellKnownKeySet) -> Result<()> {
    if key_set.issuer() != issuer {
        return Err(DirectoryError::InvalidDocument {
            issuer: issuer.to_owned(),
            reason: format!("document declares issuer '{}'", key_set.issuer()),
        });
    }
    Ok(())
}

/// Parse a key set document fetched for `issuer`.
pub fn parse_key_set(issuer: &str, bytes: &[u8]) -> Result<WellKnownKeySet> {
    let key_set = WellKnownKeySet::from_json(bytes).map_err(|e| DirectoryError::InvalidDocument {
        issuer: issuer.to_owned(),
        reason: e.to_string(),
    })?;
    validate_key_set(issuer, &key_set)?;
    Ok(key_set)
}

/// Response body of the issuer's verification API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResponse {
    pub fn from_json(issuer: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| DirectoryError::InvalidDocument {
            issuer: issuer.to_owned(),
            reason: e.to_string(),
        })
    }

    /// The revocation part of the response. Unrecognised reasons are kept
    /// as revoked with no reason.
    pub fn revocation_status(&self) -> RevocationStatus {
        if self.revoked != Some(true) {
            return RevocationStatus::Active;
        }
        RevocationStatus::Revoked {
            reason: self
                .revocation_reason
                .as_deref()
                .and_then(|r| r.parse::<RevocationReason>().ok()),
            revoked_at: self.revoked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hap_core::{KeyRecord, Keypair};

    #[test]
    fn urls() {
        let id = ClaimId::parse("hap_abc123xyz456").unwrap();
        assert_eq!(
            well_known_url("ballista.jobs"),
            "https://ballista.jobs/.well-known/hap.json"
        );
        assert_eq!(
            verify_api_url("ballista.jobs", &id),
            "https://ballista.jobs/api/v1/verify/hap_abc123xyz456"
        );
    }

    #[test]
    fn key_set_must_name_requested_issuer() {
        let set = WellKnownKeySet::with_keys(
            "ballista.jobs",
            [KeyRecord::new("k", Keypair::from_seed(&[1u8; 32]).public_key())],
        );
        let json = set.to_json().unwrap();

        assert!(parse_key_set("ballista.jobs", json.as_bytes()).is_ok());
        let err = parse_key_set("evil.example", json.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "invalid_document");
        assert!(parse_key_set("ballista.jobs", b"{}").is_err());
    }

    #[test]
    fn response_revocation() {
        let body = br#"{
            "valid": false,
            "id": "hap_abc123xyz456",
            "revoked": true,
            "revocationReason": "user_request",
            "revokedAt": "2026-02-01T00:00:00Z"
        }"#;
        let response = VerificationResponse::from_json("ballista.jobs", body).unwrap();
        match response.revocation_status() {
            RevocationStatus::Revoked { reason, revoked_at } => {
                assert_eq!(reason, Some(RevocationReason::UserRequest));
                assert!(revoked_at.is_some());
            }
            RevocationStatus::Active => panic!("expected revoked"),
        }

        let active = VerificationResponse::from_json("ballista.jobs", br#"{"valid":true}"#).unwrap();
        assert_eq!(active.revocation_status(), RevocationStatus::Active);
    }

    #[test]
    fn response_uses_camel_case() {
        let response = VerificationResponse {
            valid: true,
            verify_url: Some("https://ballista.jobs/v/hap_abc123xyz456".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"valid":true,"verifyUrl":"https://ballista.jobs/v/hap_abc123xyz456"}"#
        );
    }
}
