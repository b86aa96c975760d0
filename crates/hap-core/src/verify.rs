//! Claim verification.
//!
//! Verification runs in fixed stages and stops at the first failure:
//!
//! 1. **Structure**: parse the envelope and claim, check the id (before
//!    any key material is needed)
//! 2. **Key resolution**: find the signing key by `kid`
//! 3. **Signature**: Ed25519 over the canonical payload of the form in use
//! 4. **Issuer**: claim `iss` equals the domain the keys were fetched for
//! 5. **Expiry**: `now < expires_at`
//! 6. **Revocation**: caller-supplied status
//!
//! Stage 1 is [`UnverifiedClaim::from_jws`] / [`UnverifiedClaim::from_compact`];
//! stages 2 to 6 are [`UnverifiedClaim::verify`]. Splitting them lets a
//! caller read the untrusted issuer to fetch keys only after the claim is
//! known to be well formed. Each stage is also exposed as a standalone
//! function.
//!
//! Compact claims carry no `kid`. The caller either supplies one out of
//! band or lets verification scan the key set in publication order, in
//! which case the first key whose signature checks wins.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::compact_payload;
use crate::claim::Claim;
use crate::compact;
use crate::crypto::{PublicKey, SignatureSegment};
use crate::error::{CoreError, Stage, VerifyError};
use crate::jws::ParsedJws;
use crate::keys::{KeyRecord, WellKnownKeySet};

type VerifyResult<T> = std::result::Result<T, VerifyError>;

// ─────────────────────────────────────────────────────────────────────────
// Revocation input
// ─────────────────────────────────────────────────────────────────────────

/// Why an issuer revoked a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Fraud,
    Error,
    Legal,
    UserRequest,
}

impl RevocationReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            RevocationReason::Fraud => "fraud",
            RevocationReason::Error => "error",
            RevocationReason::Legal => "legal",
            RevocationReason::UserRequest => "user_request",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "fraud" => Ok(RevocationReason::Fraud),
            "error" => Ok(RevocationReason::Error),
            "legal" => Ok(RevocationReason::Legal),
            "user_request" => Ok(RevocationReason::UserRequest),
            other => Err(CoreError::InvalidClaim(format!(
                "unknown revocation reason '{other}'"
            ))),
        }
    }
}

/// Revocation state of a claim, as reported by its issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RevocationStatus {
    #[default]
    Active,
    Revoked {
        reason: Option<RevocationReason>,
        revoked_at: Option<DateTime<Utc>>,
    },
}

impl RevocationStatus {
    pub fn is_revoked(&self) -> bool {
        matches!(self, RevocationStatus::Revoked { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Stage functions
// ─────────────────────────────────────────────────────────────────────────

/// How ids in the test namespace are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdPolicy {
    #[default]
    ProductionOnly,
    AllowTest,
}

/// Structure stage: reject test ids unless allowed.
pub fn check_id_policy(claim: &Claim, policy: IdPolicy) -> VerifyResult<()> {
    if claim.id.is_test() && policy == IdPolicy::ProductionOnly {
        return Err(VerifyError::TestClaim(claim.id.to_string()));
    }
    Ok(())
}

/// Key resolution stage.
pub fn resolve_key<'k>(keys: &'k WellKnownKeySet, kid: &str) -> VerifyResult<&'k KeyRecord> {
    keys.get(kid).ok_or_else(|| VerifyError::KeyNotFound {
        kid: kid.to_owned(),
    })
}

/// Signature stage.
pub fn check_signature(
    key: &PublicKey,
    message: &[u8],
    signature: &SignatureSegment,
) -> VerifyResult<()> {
    signature
        .verify(key, message)
        .map_err(|_| VerifyError::SignatureInvalid)
}

/// Issuer stage. Exact, case-sensitive comparison.
pub fn check_issuer(claim: &Claim, issuer_domain: &str) -> VerifyResult<()> {
    if claim.issuer == issuer_domain {
        Ok(())
    } else {
        Err(VerifyError::IssuerMismatch {
            expected: issuer_domain.to_owned(),
            actual: claim.issuer.clone(),
        })
    }
}

/// Expiry stage. A claim is expired from `expires_at` on.
pub fn check_expiry(claim: &Claim, now: DateTime<Utc>) -> VerifyResult<()> {
    match claim.expires_at {
        Some(expired_at) if claim.is_expired_at(now) => Err(VerifyError::Expired { expired_at }),
        _ => Ok(()),
    }
}

/// Revocation stage.
pub fn check_revocation(status: &RevocationStatus) -> VerifyResult<()> {
    match status {
        RevocationStatus::Active => Ok(()),
        RevocationStatus::Revoked { reason, revoked_at } => Err(VerifyError::Revoked {
            reason: *reason,
            revoked_at: *revoked_at,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────

/// Which wire form a claim arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimForm {
    Full,
    Compact,
}

#[derive(Debug, Clone)]
enum Envelope {
    Jws(ParsedJws),
    Compact {
        kid: Option<String>,
        signature: SignatureSegment,
    },
}

/// What verification needs beyond the claim itself.
#[derive(Debug, Clone, Copy)]
pub struct VerificationContext<'a> {
    /// Keys published by the issuer.
    pub keys: &'a WellKnownKeySet,
    /// The domain `keys` were fetched for.
    pub issuer_domain: &'a str,
    pub now: DateTime<Utc>,
}

/// A structurally valid claim whose signature has not been checked.
///
/// Everything read from it is attacker-controlled until
/// [`UnverifiedClaim::verify`] succeeds.
#[derive(Debug, Clone)]
pub struct UnverifiedClaim {
    claim: Claim,
    envelope: Envelope,
}

impl UnverifiedClaim {
    /// Structure stage for the full form.
    pub fn from_jws(jws: &str, policy: IdPolicy) -> VerifyResult<Self> {
        let parsed = ParsedJws::parse(jws)?;
        let claim = parsed.claim()?;
        check_id_policy(&claim, policy)?;
        Ok(Self {
            claim,
            envelope: Envelope::Jws(parsed),
        })
    }

    /// Structure stage for the compact form. `kid`, if given, names the
    /// signing key; otherwise the key set is scanned.
    pub fn from_compact(compact: &str, kid: Option<&str>, policy: IdPolicy) -> VerifyResult<Self> {
        let decoded = compact::decode(compact)?;
        check_id_policy(&decoded.claim, policy)?;
        Ok(Self {
            claim: decoded.claim,
            envelope: Envelope::Compact {
                kid: kid.map(str::to_owned),
                signature: decoded.signature,
            },
        })
    }

    /// The untrusted claim.
    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    pub fn form(&self) -> ClaimForm {
        match self.envelope {
            Envelope::Jws(_) => ClaimForm::Full,
            Envelope::Compact { .. } => ClaimForm::Compact,
        }
    }

    /// The `kid` from the JWS header or supplied out of band.
    pub fn kid(&self) -> Option<&str> {
        match &self.envelope {
            Envelope::Jws(parsed) => Some(parsed.kid()),
            Envelope::Compact { kid, .. } => kid.as_deref(),
        }
    }

    /// Stages 2 to 6.
    pub fn verify<F>(self, ctx: &VerificationContext<'_>, revocation: F) -> VerifyResult<Verified>
    where
        F: FnOnce(&Claim) -> RevocationStatus,
    {
        let verified = self.verify_through_expiry(ctx, |_| {})?;
        check_revocation(&revocation(&verified.claim))?;
        Ok(verified)
    }

    /// Stages 2 to 5. `on_pass` is called with each stage as it passes;
    /// the caller runs the revocation stage once it has the status.
    pub fn verify_through_expiry<O>(
        self,
        ctx: &VerificationContext<'_>,
        mut on_pass: O,
    ) -> VerifyResult<Verified>
    where
        O: FnMut(Stage),
    {
        let kid = match &self.envelope {
            Envelope::Jws(parsed) => {
                let key = resolve_key(ctx.keys, parsed.kid())?;
                on_pass(Stage::KeyResolution);
                check_signature(key.public_key(), parsed.signing_input(), parsed.signature())?;
                key.kid().to_owned()
            }
            Envelope::Compact { kid, signature } => {
                let payload = compact_payload(&self.claim)?;
                match kid {
                    Some(kid) => {
                        let key = resolve_key(ctx.keys, kid)?;
                        on_pass(Stage::KeyResolution);
                        check_signature(key.public_key(), payload.as_bytes(), signature)?;
                        key.kid().to_owned()
                    }
                    None => {
                        let key = scan_keys(ctx.keys, payload.as_bytes(), signature)?;
                        on_pass(Stage::KeyResolution);
                        key.kid().to_owned()
                    }
                }
            }
        };
        on_pass(Stage::Signature);

        check_issuer(&self.claim, ctx.issuer_domain)?;
        on_pass(Stage::Issuer);
        check_expiry(&self.claim, ctx.now)?;
        on_pass(Stage::Expiry);

        let form = self.form();
        Ok(Verified {
            claim: self.claim,
            kid,
            form,
        })
    }
}

/// Try each key in publication order; the first that verifies wins.
pub fn scan_keys<'k>(
    keys: &'k WellKnownKeySet,
    message: &[u8],
    signature: &SignatureSegment,
) -> VerifyResult<&'k KeyRecord> {
    if keys.is_empty() {
        return Err(VerifyError::KeyNotFound { kid: "*".into() });
    }
    keys.iter()
        .find(|key| signature.verifies(key.public_key(), message))
        .ok_or(VerifyError::SignatureInvalid)
}

/// A claim that passed every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub claim: Claim,
    /// The key that signed it.
    pub kid: String,
    pub form: ClaimForm,
}

/// Verify a full-form claim in one call.
pub fn verify_jws<F>(
    jws: &str,
    ctx: &VerificationContext<'_>,
    policy: IdPolicy,
    revocation: F,
) -> VerifyResult<Verified>
where
    F: FnOnce(&Claim) -> RevocationStatus,
{
    UnverifiedClaim::from_jws(jws, policy)?.verify(ctx, revocation)
}

/// Verify a compact claim in one call.
pub fn verify_compact<F>(
    compact: &str,
    kid: Option<&str>,
    ctx: &VerificationContext<'_>,
    policy: IdPolicy,
    revocation: F,
) -> VerifyResult<Verified>
where
    F: FnOnce(&Claim) -> RevocationStatus,
{
    UnverifiedClaim::from_compact(compact, kid, policy)?.verify(ctx, revocation)
}

// ─────────────────────────────────────────────────────────────────────────
// Result record
// ─────────────────────────────────────────────────────────────────────────

/// How much of a failure to reveal in a [`VerificationRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disclosure {
    /// Every failure reads `"invalid"`. Safe for untrusted callers.
    #[default]
    Opaque,
    /// The stage-specific error code.
    Detailed,
}

/// Error string used by [`Disclosure::Opaque`].
pub const OPAQUE_ERROR: &str = "invalid";

/// `{valid, claim?, error?}`, the result shape handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Claim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationRecord {
    pub fn from_outcome(outcome: &VerifyResult<Verified>, disclosure: Disclosure) -> Self {
        match outcome {
            Ok(verified) => Self {
                valid: true,
                claim: Some(verified.claim.clone()),
                error: None,
            },
            Err(err) => Self {
                valid: false,
                claim: None,
                error: Some(match disclosure {
                    Disclosure::Opaque => OPAQUE_ERROR.to_owned(),
                    Disclosure::Detailed => err.code().to_owned(),
                }),
            },
        }
    }
}
