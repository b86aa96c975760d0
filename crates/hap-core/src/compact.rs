//! The compact claim form.
//!
//! A compact claim is the nine-field payload from [`compact_payload`]
//! followed by a tenth field, the unpadded base64url Ed25519 signature
//! over the payload bytes. It is meant for QR codes and URLs, so it drops
//! the full-form-only fields (tier, description, effort dimensions).
//!
//! The older nine-field layout without a shape tag is recognised only to
//! report it as an unsupported version.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;
use url::Url;

use crate::canonical::{compact_payload, decode_field, COMPACT_SEPARATOR, COMPACT_VERSION};
use crate::claim::{Claim, ClaimBody, ClaimShape, Effort, Party, PROTOCOL_VERSION};
use crate::crypto::{Keypair, Signature, SignatureSegment};
use crate::error::{CoreError, Result};
use crate::id::ClaimId;

/// Query parameter that carries a compact claim in a verification URL.
pub const URL_PARAM: &str = "c";

static COMPACT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^HAP1\.hap_[A-Za-z0-9]{12}\.[^.]+\.[^.]+\.[^.]+\.[^.]*\.\d+\.\d+\.[^.]+\.[A-Za-z0-9_-]+$",
    )
    .expect("compact pattern is a valid regex")
});

static LEGACY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^HAP1\.hap_[A-Za-z0-9_]+\.[^.]+\.[^.]+\.[^.]*\.\d+\.\d+\.[^.]+\.[A-Za-z0-9_-]+$")
        .expect("legacy compact pattern is a valid regex")
});

/// A decoded compact claim. Not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCompact {
    pub claim: Claim,
    pub signature: SignatureSegment,
}

/// True if `s` has the current compact layout.
pub fn is_valid_compact(s: &str) -> bool {
    COMPACT_PATTERN.is_match(s)
}

/// Append a signature to a claim's compact payload.
pub fn encode(claim: &Claim, signature: &Signature) -> Result<String> {
    Ok(format!(
        "{}{COMPACT_SEPARATOR}{}",
        compact_payload(claim)?,
        signature.to_base64url()
    ))
}

/// Sign a claim's compact payload and encode it.
pub fn sign_compact(claim: &Claim, keypair: &Keypair) -> Result<String> {
    claim.validate()?;
    let payload = compact_payload(claim)?;
    let signature = keypair.sign(payload.as_bytes());
    Ok(format!(
        "{payload}{COMPACT_SEPARATOR}{}",
        signature.to_base64url()
    ))
}

fn check_version(s: &str) -> Result<()> {
    let version = s.split(COMPACT_SEPARATOR).next().unwrap_or_default();
    if version != COMPACT_VERSION {
        return if version.starts_with("HAP") {
            Err(CoreError::UnsupportedVersion(version.to_owned()))
        } else {
            Err(CoreError::MalformedCompact("missing HAP version prefix".into()))
        };
    }
    if LEGACY_PATTERN.is_match(s) {
        return Err(CoreError::UnsupportedVersion(
            "HAP1 layout without a claim type".into(),
        ));
    }
    Ok(())
}

fn malformed(what: &str) -> impl Fn(CoreError) -> CoreError + '_ {
    move |e| CoreError::MalformedCompact(format!("{what}: {e}"))
}

fn parse_epoch(field: &str, what: &str) -> Result<i64> {
    field
        .parse::<i64>()
        .map_err(|_| CoreError::MalformedCompact(format!("{what} out of range")))
}

/// Decode a compact claim. Structure only; see [`crate::verify`] for
/// signature checking.
pub fn decode(s: &str) -> Result<DecodedCompact> {
    check_version(s)?;
    if !is_valid_compact(s) {
        return Err(CoreError::MalformedCompact(
            "does not match the HAP1 layout".into(),
        ));
    }

    let fields: Vec<&str> = s.split(COMPACT_SEPARATOR).collect();
    let [_, id, shape, token, name, domain, at, exp, iss, signature] = fields.as_slice() else {
        return Err(CoreError::MalformedCompact("expected ten fields".into()));
    };

    let id = ClaimId::parse_production(id)?;
    let shape: ClaimShape = shape.parse().map_err(malformed("claim type"))?;
    let token = decode_field(token)?;
    let party = Party {
        name: decode_field(name)?,
        domain: Some(decode_field(domain)?).filter(|d| !d.is_empty()),
    };
    let body = ClaimBody::from_parts(shape, &token, party).map_err(malformed("claim body"))?;

    let issued_at = DateTime::from_timestamp(parse_epoch(at, "issued_at")?, 0)
        .ok_or_else(|| CoreError::MalformedCompact("issued_at out of range".into()))?;
    let expires_at = match parse_epoch(exp, "expires_at")? {
        0 => None,
        secs => Some(
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CoreError::MalformedCompact("expires_at out of range".into()))?,
        ),
    };

    let signature = SignatureSegment::parse(signature).map_err(malformed("signature"))?;

    let claim = Claim {
        version: PROTOCOL_VERSION.to_owned(),
        id,
        body,
        tier: None,
        description: None,
        issued_at,
        expires_at,
        issuer: decode_field(iss)?,
        effort: Effort::default(),
    };

    // The signature is checked against a re-encoding of the claim, so the
    // received fields must already be in that encoding.
    let received = s
        .rsplit_once(COMPACT_SEPARATOR)
        .map(|(payload, _)| payload)
        .unwrap_or_default();
    if compact_payload(&claim).map_err(malformed("payload"))? != received {
        return Err(CoreError::MalformedCompact(
            "fields are not canonically encoded".into(),
        ));
    }

    Ok(DecodedCompact { claim, signature })
}

/// `base?c=<escaped compact>`.
pub fn build_verification_url(base: &str, compact: &str) -> String {
    format!("{base}?{URL_PARAM}={}", urlencoding::encode(compact))
}

/// Pull a compact claim out of a verification URL. Returns `None` if the
/// URL does not parse, has no `c` parameter, or the value is not a valid
/// compact claim.
pub fn extract_compact(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let compact = parsed
        .query_pairs()
        .find(|(key, _)| key == URL_PARAM)
        .map(|(_, value)| value.into_owned())?;
    is_valid_compact(&compact).then_some(compact)
}
