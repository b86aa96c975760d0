//! Proptest generators for property-based testing.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use hap_core::{
    Claim, ClaimBody, ClaimId, ClaimShape, CommitmentLevel, Keypair, Method, Party, Result,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a production claim id.
pub fn claim_id() -> impl Strategy<Value = ClaimId> {
    "hap_[A-Za-z0-9]{12}".prop_filter_map("valid id", |s| ClaimId::parse(&s).ok())
}

/// Generate a method, registered or custom.
pub fn method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::PhysicalMail),
        Just(Method::VideoInterview),
        Just(Method::PaidAssessment),
        Just(Method::Referral),
        "x-[a-z0-9_-]{1,16}".prop_filter_map("custom method", |t| Method::custom(t).ok()),
    ]
}

/// Generate a commitment level, registered or custom.
pub fn commitment_level() -> impl Strategy<Value = CommitmentLevel> {
    prop_oneof![
        Just(CommitmentLevel::ReviewVerified),
        Just(CommitmentLevel::PrioritizeVerified),
        Just(CommitmentLevel::RespondVerified),
        "x-[a-z0-9_-]{1,16}"
            .prop_filter_map("custom commitment", |t| CommitmentLevel::custom(t).ok()),
    ]
}

/// Generate an organization name. Includes dots, spaces and `%`, which
/// the compact form has to escape.
pub fn party_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .,&%'-]{0,39}".prop_map(String::from)
}

/// Generate a DNS-style domain.
pub fn domain() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}(\\.[a-z]{2,6}){1,2}".prop_map(String::from)
}

/// Generate a party, with or without a domain.
pub fn party() -> impl Strategy<Value = Party> {
    (party_name(), proptest::option::of(domain())).prop_map(|(name, domain)| Party { name, domain })
}

/// Generate a claim body of any shape.
pub fn claim_body() -> impl Strategy<Value = ClaimBody> {
    prop_oneof![
        (method(), party()).prop_map(|(method, target)| ClaimBody::HumanEffort { method, target }),
        (commitment_level(), party()).prop_map(|(commitment, recipient)| {
            ClaimBody::RecipientCommitment {
                commitment,
                recipient,
            }
        }),
        (method(), party())
            .prop_map(|(method, target)| ClaimBody::PhysicalDelivery { method, target }),
        (method(), party())
            .prop_map(|(method, target)| ClaimBody::FinancialCommitment { method, target }),
        (method(), party())
            .prop_map(|(method, target)| ClaimBody::ContentAttestation { method, target }),
    ]
}

/// Generate any claim shape.
pub fn claim_shape() -> impl Strategy<Value = ClaimShape> {
    proptest::sample::select(ClaimShape::ALL.to_vec())
}

/// Generate an issuance time between 2020 and 2033, in whole seconds.
pub fn issued_at() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..=2_000_000_000i64)
        .prop_filter_map("in range", |secs| DateTime::from_timestamp(secs, 0))
}

/// Parameters for generating a claim.
#[derive(Debug, Clone)]
pub struct ClaimParams {
    pub id: ClaimId,
    pub issuer: String,
    pub body: ClaimBody,
    pub issued_at: DateTime<Utc>,
    /// Lifetime in seconds, if the claim expires.
    pub ttl_seconds: Option<u32>,
    pub tier: Option<String>,
    pub description: Option<String>,
    pub cost: Option<(u64, String)>,
    pub time_seconds: Option<u64>,
    pub physical: Option<bool>,
    pub energy_kcal: Option<u64>,
}

impl Arbitrary for ClaimParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            (claim_id(), domain(), claim_body(), issued_at()),
            proptest::option::of(1u32..=400_000_000u32), // ttl, up to ~12 years
            proptest::option::of("[a-z]{3,10}"),         // tier
            proptest::option::of("[A-Za-z0-9 ,.]{1,60}"), // description
            proptest::option::of((0u64..=1_000_000u64, "[A-Z]{3}")),
            proptest::option::of(0u64..=1_000_000u64), // time
            proptest::option::of(any::<bool>()),
            proptest::option::of(0u64..=10_000u64), // energy
        )
            .prop_map(
                |(
                    (id, issuer, body, issued_at),
                    ttl_seconds,
                    tier,
                    description,
                    cost,
                    time_seconds,
                    physical,
                    energy_kcal,
                )| ClaimParams {
                    id,
                    issuer,
                    body,
                    issued_at,
                    ttl_seconds,
                    tier,
                    description,
                    cost,
                    time_seconds,
                    physical,
                    energy_kcal,
                },
            )
            .boxed()
    }
}

/// Build a claim from parameters.
pub fn claim_from_params(params: &ClaimParams) -> Result<Claim> {
    let mut builder = Claim::builder(params.id.clone(), params.issuer.as_str())
        .body(params.body.clone())
        .issued_at(params.issued_at);

    if let Some(ttl) = params.ttl_seconds {
        builder = builder.expires_in(Duration::seconds(i64::from(ttl)));
    }
    if let Some(tier) = &params.tier {
        builder = builder.tier(tier.as_str());
    }
    if let Some(description) = &params.description {
        builder = builder.description(description.as_str());
    }
    if let Some((amount, currency)) = &params.cost {
        builder = builder.cost(*amount, currency.as_str());
    }
    if let Some(seconds) = params.time_seconds {
        builder = builder.time_seconds(seconds);
    }
    if let Some(physical) = params.physical {
        builder = builder.physical(physical);
    }
    if let Some(kcal) = params.energy_kcal {
        builder = builder.energy_kcal(kcal);
    }
    builder.build()
}

/// Generate a valid claim.
pub fn claim() -> impl Strategy<Value = Claim> {
    any::<ClaimParams>().prop_filter_map("valid claim", |p| claim_from_params(&p).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_params_always_build(params: ClaimParams) {
            prop_assert!(claim_from_params(&params).is_ok());
        }

        #[test]
        fn generated_names_are_nonempty(name in party_name()) {
            prop_assert!(!name.is_empty());
        }
    }
}
