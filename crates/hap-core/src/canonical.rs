//! Canonical encodings of a claim.
//!
//! Two byte layouts are signed, and both are frozen:
//!
//! - **Full form**: compact JSON with a fixed key order, no insignificant
//!   whitespace, absent optional fields omitted, timestamps as RFC 3339
//!   UTC with whole seconds and a `Z` suffix. These bytes become the JWS
//!   payload.
//! - **Compact payload**: nine `.`-separated fields
//!   `HAP1.id.shape.method_or_commitment.name.domain.at.exp.iss`, each
//!   percent-encoded with `.` escaped as `%2E`. Timestamps are epoch
//!   seconds and an `exp` of `0` means no expiry. The compact signature
//!   covers these bytes.
//!
//! Any change to either layout breaks every signature already issued.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::{check_version, Claim, ClaimBody, ClaimShape, Cost, Effort, Party};
use crate::error::{CoreError, Result};
use crate::id::ClaimId;

/// Version token that opens every compact claim.
pub const COMPACT_VERSION: &str = "HAP1";

/// Field separator of the compact form.
pub const COMPACT_SEPARATOR: char = '.';

// ─────────────────────────────────────────────────────────────────────────
// Full form
// ─────────────────────────────────────────────────────────────────────────

/// Serialization view of a claim. Field order is the canonical key order.
#[derive(Serialize)]
pub(crate) struct ClaimWire<'a> {
    v: &'a str,
    id: &'a ClaimId,
    #[serde(rename = "type")]
    shape: ClaimShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipient: Option<&'a Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commitment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<String>,
    iss: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<&'a Cost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    physical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<u64>,
}

impl<'a> ClaimWire<'a> {
    pub(crate) fn from_claim(claim: &'a Claim) -> Self {
        let (method, to, recipient, commitment) = match &claim.body {
            ClaimBody::RecipientCommitment {
                commitment,
                recipient,
            } => (None, None, Some(recipient), Some(commitment.as_str())),
            ClaimBody::HumanEffort { method, target }
            | ClaimBody::PhysicalDelivery { method, target }
            | ClaimBody::FinancialCommitment { method, target }
            | ClaimBody::ContentAttestation { method, target } => {
                (Some(method.as_str()), Some(target), None, None)
            }
        };

        Self {
            v: &claim.version,
            id: &claim.id,
            shape: claim.body.shape(),
            method,
            tier: claim.tier.as_deref(),
            to,
            recipient,
            commitment,
            description: claim.description.as_deref(),
            at: format_timestamp(claim.issued_at),
            exp: claim.expires_at.map(format_timestamp),
            iss: &claim.issuer,
            cost: claim.effort.cost.as_ref(),
            time: claim.effort.time_seconds,
            physical: claim.effort.physical,
            energy: claim.effort.energy_kcal,
        }
    }
}

/// Deserialization view of a claim. Unknown keys are ignored.
#[derive(Deserialize)]
pub(crate) struct OwnedClaimWire {
    v: String,
    id: String,
    #[serde(rename = "type")]
    shape: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    to: Option<Party>,
    #[serde(default)]
    recipient: Option<Party>,
    #[serde(default)]
    commitment: Option<String>,
    #[serde(default)]
    description: Option<String>,
    at: String,
    #[serde(default)]
    exp: Option<String>,
    iss: String,
    #[serde(default)]
    cost: Option<Cost>,
    #[serde(default)]
    time: Option<u64>,
    #[serde(default)]
    physical: Option<bool>,
    #[serde(default)]
    energy: Option<u64>,
}

impl TryFrom<OwnedClaimWire> for Claim {
    type Error = CoreError;

    fn try_from(wire: OwnedClaimWire) -> Result<Self> {
        // Version and id are checked first so that they surface as their
        // own error kinds rather than as a generic invalid claim.
        check_version(&wire.v)?;
        let id = ClaimId::parse(&wire.id)?;
        let shape: ClaimShape = wire.shape.parse()?;

        let body = match shape {
            ClaimShape::RecipientCommitment => {
                if wire.method.is_some() || wire.to.is_some() {
                    return Err(CoreError::InvalidClaim(
                        "recipient_commitment carries 'method' or 'to'".into(),
                    ));
                }
                let commitment = wire
                    .commitment
                    .ok_or_else(|| CoreError::InvalidClaim("missing 'commitment'".into()))?;
                let recipient = wire
                    .recipient
                    .ok_or_else(|| CoreError::InvalidClaim("missing 'recipient'".into()))?;
                ClaimBody::from_parts(shape, &commitment, recipient)?
            }
            _ => {
                if wire.commitment.is_some() || wire.recipient.is_some() {
                    return Err(CoreError::InvalidClaim(format!(
                        "{shape} carries 'commitment' or 'recipient'"
                    )));
                }
                let method = wire
                    .method
                    .ok_or_else(|| CoreError::InvalidClaim("missing 'method'".into()))?;
                let target = wire
                    .to
                    .ok_or_else(|| CoreError::InvalidClaim("missing 'to'".into()))?;
                ClaimBody::from_parts(shape, &method, target)?
            }
        };

        Ok(Claim {
            version: wire.v,
            id,
            body,
            tier: wire.tier,
            description: wire.description,
            issued_at: parse_timestamp(&wire.at)?,
            expires_at: wire.exp.as_deref().map(parse_timestamp).transpose()?,
            issuer: wire.iss,
            effort: Effort {
                cost: wire.cost,
                time_seconds: wire.time,
                physical: wire.physical,
                energy_kcal: wire.energy,
            },
        })
    }
}

/// RFC 3339, UTC, whole seconds, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("'{s}': {e}")))
}

/// Canonical full-form bytes of a claim.
pub fn canonical_json(claim: &Claim) -> Result<Vec<u8>> {
    serde_json::to_vec(&ClaimWire::from_claim(claim)).map_err(|e| CoreError::Encoding(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────
// Compact payload
// ─────────────────────────────────────────────────────────────────────────

/// The shape-dependent slots of a compact claim.
///
/// For commitments the slot after the shape tag holds the commitment and
/// the party is the recipient; for every other shape it holds the method
/// and the party is the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSlots<'a> {
    pub shape: ClaimShape,
    pub method_or_commitment: &'a str,
    pub party_name: &'a str,
    pub party_domain: &'a str,
}

impl<'a> CompactSlots<'a> {
    pub fn resolve(body: &'a ClaimBody) -> Self {
        let (token, party) = match body {
            ClaimBody::RecipientCommitment {
                commitment,
                recipient,
            } => (commitment.as_str(), recipient),
            ClaimBody::HumanEffort { method, target }
            | ClaimBody::PhysicalDelivery { method, target }
            | ClaimBody::FinancialCommitment { method, target }
            | ClaimBody::ContentAttestation { method, target } => (method.as_str(), target),
        };
        Self {
            shape: body.shape(),
            method_or_commitment: token,
            party_name: &party.name,
            party_domain: party.domain.as_deref().unwrap_or_default(),
        }
    }
}

/// Percent-encode one compact field. `.` is escaped too, so the result
/// never contains the field separator.
pub fn encode_field(value: &str) -> String {
    urlencoding::encode(value).replace('.', "%2E")
}

/// Reverse [`encode_field`].
pub fn decode_field(value: &str) -> Result<String> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CoreError::MalformedCompact(format!("field is not valid UTF-8: {e}")))
}

/// Seconds since the Unix epoch. Pre-epoch instants have no encoding.
pub fn epoch_seconds(ts: DateTime<Utc>) -> Result<u64> {
    u64::try_from(ts.timestamp())
        .map_err(|_| CoreError::InvalidTimestamp(format!("{ts} is before the Unix epoch")))
}

/// The nine-field compact payload that the compact signature covers.
pub fn compact_payload(claim: &Claim) -> Result<String> {
    if claim.id.is_test() {
        return Err(CoreError::MalformedId(format!(
            "{}: test ids have no compact encoding",
            claim.id
        )));
    }
    let slots = CompactSlots::resolve(&claim.body);
    let at = epoch_seconds(claim.issued_at)?;
    let exp = match claim.expires_at {
        Some(exp) => match epoch_seconds(exp)? {
            0 => {
                return Err(CoreError::InvalidTimestamp(
                    "expiry at the epoch collides with 'no expiry'".into(),
                ))
            }
            secs => secs,
        },
        None => 0,
    };

    let fields = [
        COMPACT_VERSION.to_owned(),
        claim.id.to_string(),
        slots.shape.as_str().to_owned(),
        encode_field(slots.method_or_commitment),
        encode_field(slots.party_name),
        encode_field(slots.party_domain),
        at.to_string(),
        exp.to_string(),
        encode_field(&claim.issuer),
    ];
    Ok(fields.join("."))
}
