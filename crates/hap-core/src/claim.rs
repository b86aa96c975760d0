//! The HAP claim model.
//!
//! A claim says that an issuer verified some human effort directed at a
//! recipient, or that a recipient made a commitment about how it treats
//! verified applicants. The shape is a closed sum type: each variant
//! carries exactly the fields that shape needs, so there is no way to
//! build a recipient commitment with a `method`, or a human-effort claim
//! without a target.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::{ClaimWire, OwnedClaimWire};
use crate::error::{CoreError, Result};
use crate::id::ClaimId;

/// Protocol version written into the `v` field of new claims.
pub const PROTOCOL_VERSION: &str = "0.1";

/// Major version this implementation understands.
pub const SUPPORTED_MAJOR: &str = "0";

static CUSTOM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^x-[A-Za-z0-9_-]+$").expect("custom token pattern is a valid regex")
});

/// Check that a version string has a supported major component.
pub fn check_version(version: &str) -> Result<()> {
    let major = version.split('.').next().unwrap_or_default();
    if major == SUPPORTED_MAJOR {
        Ok(())
    } else {
        Err(CoreError::UnsupportedVersion(version.to_owned()))
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Shapes and tokens
// ─────────────────────────────────────────────────────────────────────────

/// The five claim shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimShape {
    HumanEffort,
    RecipientCommitment,
    PhysicalDelivery,
    FinancialCommitment,
    ContentAttestation,
}

impl ClaimShape {
    pub const ALL: [ClaimShape; 5] = [
        ClaimShape::HumanEffort,
        ClaimShape::RecipientCommitment,
        ClaimShape::PhysicalDelivery,
        ClaimShape::FinancialCommitment,
        ClaimShape::ContentAttestation,
    ];

    /// Wire tag, as used in the `type` field and the compact shape slot.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClaimShape::HumanEffort => "human_effort",
            ClaimShape::RecipientCommitment => "recipient_commitment",
            ClaimShape::PhysicalDelivery => "physical_delivery",
            ClaimShape::FinancialCommitment => "financial_commitment",
            ClaimShape::ContentAttestation => "content_attestation",
        }
    }
}

impl fmt::Display for ClaimShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimShape {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|shape| shape.as_str() == s)
            .ok_or_else(|| CoreError::InvalidClaim(format!("unknown claim type '{s}'")))
    }
}

fn check_custom_token(kind: &str, s: &str) -> Result<()> {
    if CUSTOM_TOKEN.is_match(s) {
        Ok(())
    } else {
        Err(CoreError::InvalidClaim(format!("unknown {kind} '{s}'")))
    }
}

/// How the issuer verified the effort.
///
/// Custom methods must use the `x-` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    PhysicalMail,
    VideoInterview,
    PaidAssessment,
    Referral,
    Custom(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::PhysicalMail => "physical_mail",
            Method::VideoInterview => "video_interview",
            Method::PaidAssessment => "paid_assessment",
            Method::Referral => "referral",
            Method::Custom(token) => token,
        }
    }

    /// Build a custom method, checking the `x-` prefix.
    pub fn custom(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        check_custom_token("method", &token)?;
        Ok(Method::Custom(token))
    }
}

impl FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "physical_mail" => Ok(Method::PhysicalMail),
            "video_interview" => Ok(Method::VideoInterview),
            "paid_assessment" => Ok(Method::PaidAssessment),
            "referral" => Ok(Method::Referral),
            other => Method::custom(other),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        match method {
            Method::Custom(token) => token,
            core => core.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a recipient commits to doing with verified applicants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CommitmentLevel {
    ReviewVerified,
    PrioritizeVerified,
    RespondVerified,
    Custom(String),
}

impl CommitmentLevel {
    pub fn as_str(&self) -> &str {
        match self {
            CommitmentLevel::ReviewVerified => "review_verified",
            CommitmentLevel::PrioritizeVerified => "prioritize_verified",
            CommitmentLevel::RespondVerified => "respond_verified",
            CommitmentLevel::Custom(token) => token,
        }
    }

    pub fn custom(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        check_custom_token("commitment", &token)?;
        Ok(CommitmentLevel::Custom(token))
    }
}

impl FromStr for CommitmentLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "review_verified" => Ok(CommitmentLevel::ReviewVerified),
            "prioritize_verified" => Ok(CommitmentLevel::PrioritizeVerified),
            "respond_verified" => Ok(CommitmentLevel::RespondVerified),
            other => CommitmentLevel::custom(other),
        }
    }
}

impl TryFrom<String> for CommitmentLevel {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CommitmentLevel> for String {
    fn from(level: CommitmentLevel) -> Self {
        match level {
            CommitmentLevel::Custom(token) => token,
            core => core.as_str().to_owned(),
        }
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Parties and effort
// ─────────────────────────────────────────────────────────────────────────

/// The organization a claim is directed at, or that made a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Party {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
        }
    }

    pub fn with_domain(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Some(domain.into()),
        }
    }
}

/// Money spent on the effort, in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    pub amount: u64,
    pub currency: String,
}

/// Optional effort dimensions. Carried in the full form only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Effort {
    pub cost: Option<Cost>,
    pub time_seconds: Option<u64>,
    pub physical: Option<bool>,
    pub energy_kcal: Option<u64>,
}

impl Effort {
    pub fn is_empty(&self) -> bool {
        self.cost.is_none()
            && self.time_seconds.is_none()
            && self.physical.is_none()
            && self.energy_kcal.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Claim body
// ─────────────────────────────────────────────────────────────────────────

/// Shape-specific claim content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimBody {
    HumanEffort { method: Method, target: Party },
    RecipientCommitment {
        commitment: CommitmentLevel,
        recipient: Party,
    },
    PhysicalDelivery { method: Method, target: Party },
    FinancialCommitment { method: Method, target: Party },
    ContentAttestation { method: Method, target: Party },
}

impl ClaimBody {
    pub fn shape(&self) -> ClaimShape {
        match self {
            ClaimBody::HumanEffort { .. } => ClaimShape::HumanEffort,
            ClaimBody::RecipientCommitment { .. } => ClaimShape::RecipientCommitment,
            ClaimBody::PhysicalDelivery { .. } => ClaimShape::PhysicalDelivery,
            ClaimBody::FinancialCommitment { .. } => ClaimShape::FinancialCommitment,
            ClaimBody::ContentAttestation { .. } => ClaimShape::ContentAttestation,
        }
    }

    /// The target, or the recipient for commitments.
    pub fn party(&self) -> &Party {
        match self {
            ClaimBody::HumanEffort { target, .. }
            | ClaimBody::PhysicalDelivery { target, .. }
            | ClaimBody::FinancialCommitment { target, .. }
            | ClaimBody::ContentAttestation { target, .. } => target,
            ClaimBody::RecipientCommitment { recipient, .. } => recipient,
        }
    }

    /// The method token, or the commitment token for commitments.
    pub fn token(&self) -> &str {
        match self {
            ClaimBody::HumanEffort { method, .. }
            | ClaimBody::PhysicalDelivery { method, .. }
            | ClaimBody::FinancialCommitment { method, .. }
            | ClaimBody::ContentAttestation { method, .. } => method.as_str(),
            ClaimBody::RecipientCommitment { commitment, .. } => commitment.as_str(),
        }
    }

    /// Rebuild a body from its shape tag, token and party.
    pub fn from_parts(shape: ClaimShape, token: &str, party: Party) -> Result<Self> {
        if party.name.is_empty() {
            return Err(CoreError::InvalidClaim("party name is empty".into()));
        }
        let body = match shape {
            ClaimShape::RecipientCommitment => ClaimBody::RecipientCommitment {
                commitment: token.parse()?,
                recipient: party,
            },
            ClaimShape::HumanEffort => ClaimBody::HumanEffort {
                method: token.parse()?,
                target: party,
            },
            ClaimShape::PhysicalDelivery => ClaimBody::PhysicalDelivery {
                method: token.parse()?,
                target: party,
            },
            ClaimShape::FinancialCommitment => ClaimBody::FinancialCommitment {
                method: token.parse()?,
                target: party,
            },
            ClaimShape::ContentAttestation => ClaimBody::ContentAttestation {
                method: token.parse()?,
                target: party,
            },
        };
        Ok(body)
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Claim
// ─────────────────────────────────────────────────────────────────────────

/// A HAP claim.
///
/// Timestamps are held at whole-second precision when built through
/// [`ClaimBuilder`]; that is the precision both wire forms carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    pub version: String,
    pub id: ClaimId,
    pub body: ClaimBody,
    pub tier: Option<String>,
    pub description: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issuer: String,
    pub effort: Effort,
}

impl Claim {
    pub fn builder(id: ClaimId, issuer: impl Into<String>) -> ClaimBuilder {
        ClaimBuilder::new(id, issuer)
    }

    pub fn shape(&self) -> ClaimShape {
        self.body.shape()
    }

    /// Expired if `now` is at or past `expires_at`. No expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// True if the claim's party has the given domain. Case-sensitive.
    pub fn is_for_recipient(&self, domain: &str) -> bool {
        self.body.party().domain.as_deref() == Some(domain)
    }

    /// The claim as it survives a trip through the compact form:
    /// version, tier, description and effort dimensions are not carried.
    pub fn compact_view(&self) -> Claim {
        Claim {
            version: PROTOCOL_VERSION.to_owned(),
            id: self.id.clone(),
            body: self.body.clone(),
            tier: None,
            description: None,
            issued_at: self.issued_at.trunc_subsecs(0),
            expires_at: self.expires_at.map(|exp| exp.trunc_subsecs(0)),
            issuer: self.issuer.clone(),
            effort: Effort::default(),
        }
    }

    /// Parse a full-form claim from JSON bytes, keeping the structural
    /// error kind (bad id, unsupported version, bad field).
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let wire: OwnedClaimWire = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::InvalidClaim(format!("claim JSON: {e}")))?;
        wire.try_into()
    }

    /// Check the fields a builder would have checked.
    pub fn validate(&self) -> Result<()> {
        check_version(&self.version)?;
        if self.issuer.is_empty() {
            return Err(CoreError::InvalidClaim("issuer is empty".into()));
        }
        if self.body.party().name.is_empty() {
            return Err(CoreError::InvalidClaim("party name is empty".into()));
        }
        if self.issued_at < DateTime::UNIX_EPOCH {
            return Err(CoreError::InvalidTimestamp(
                "issued_at is before the Unix epoch".into(),
            ));
        }
        if let Some(exp) = self.expires_at {
            if exp <= self.issued_at {
                return Err(CoreError::InvalidTimestamp(
                    "expires_at must be after issued_at".into(),
                ));
            }
        }
        Ok(())
    }
}

/// See [`Claim::is_expired_at`].
pub fn is_claim_expired(claim: &Claim, now: DateTime<Utc>) -> bool {
    claim.is_expired_at(now)
}

/// See [`Claim::is_for_recipient`].
pub fn is_claim_for_recipient(claim: &Claim, domain: &str) -> bool {
    claim.is_for_recipient(domain)
}

impl Serialize for Claim {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ClaimWire::from_claim(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Claim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = OwnedClaimWire::deserialize(deserializer)?;
        wire.try_into().map_err(serde::de::Error::custom)
    }
}

/// Builder for [`Claim`].
///
/// The body is required; everything else has a default. `issued_at`
/// defaults to now.
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    id: ClaimId,
    issuer: String,
    body: Option<ClaimBody>,
    tier: Option<String>,
    description: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    expires_in: Option<Duration>,
    effort: Effort,
}

impl ClaimBuilder {
    pub fn new(id: ClaimId, issuer: impl Into<String>) -> Self {
        Self {
            id,
            issuer: issuer.into(),
            body: None,
            tier: None,
            description: None,
            issued_at: None,
            expires_at: None,
            expires_in: None,
            effort: Effort::default(),
        }
    }

    pub fn body(mut self, body: ClaimBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn human_effort(self, method: Method, target: Party) -> Self {
        self.body(ClaimBody::HumanEffort { method, target })
    }

    pub fn recipient_commitment(self, commitment: CommitmentLevel, recipient: Party) -> Self {
        self.body(ClaimBody::RecipientCommitment {
            commitment,
            recipient,
        })
    }

    pub fn physical_delivery(self, method: Method, target: Party) -> Self {
        self.body(ClaimBody::PhysicalDelivery { method, target })
    }

    pub fn financial_commitment(self, method: Method, target: Party) -> Self {
        self.body(ClaimBody::FinancialCommitment { method, target })
    }

    pub fn content_attestation(self, method: Method, target: Party) -> Self {
        self.body(ClaimBody::ContentAttestation { method, target })
    }

    pub fn tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    pub fn expires_at(mut self, exp: DateTime<Utc>) -> Self {
        self.expires_at = Some(exp);
        self.expires_in = None;
        self
    }

    /// Expire `ttl` after `issued_at`.
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self.expires_at = None;
        self
    }

    pub fn expires_in_days(self, days: i64) -> Self {
        self.expires_in(Duration::days(days))
    }

    /// Clear any expiry set so far.
    pub fn never_expires(mut self) -> Self {
        self.expires_at = None;
        self.expires_in = None;
        self
    }

    pub fn effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn cost(mut self, amount: u64, currency: impl Into<String>) -> Self {
        self.effort.cost = Some(Cost {
            amount,
            currency: currency.into(),
        });
        self
    }

    pub fn time_seconds(mut self, seconds: u64) -> Self {
        self.effort.time_seconds = Some(seconds);
        self
    }

    pub fn physical(mut self, physical: bool) -> Self {
        self.effort.physical = Some(physical);
        self
    }

    pub fn energy_kcal(mut self, kcal: u64) -> Self {
        self.effort.energy_kcal = Some(kcal);
        self
    }

    pub fn build(self) -> Result<Claim> {
        let body = self
            .body
            .ok_or_else(|| CoreError::InvalidClaim("claim body is required".into()))?;
        let issued_at = self.issued_at.unwrap_or_else(Utc::now).trunc_subsecs(0);
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(exp), _) => Some(exp.trunc_subsecs(0)),
            (None, Some(ttl)) => Some(
                issued_at
                    .checked_add_signed(ttl)
                    .ok_or_else(|| CoreError::InvalidTimestamp("expiry overflows".into()))?,
            ),
            (None, None) => None,
        };

        let claim = Claim {
            version: PROTOCOL_VERSION.to_owned(),
            id: self.id,
            body,
            tier: self.tier,
            description: self.description,
            issued_at,
            expires_at,
            issuer: self.issuer,
            effort: self.effort,
        };
        claim.validate()?;
        Ok(claim)
    }
}
