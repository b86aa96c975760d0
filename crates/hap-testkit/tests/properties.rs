//! Property tests over generated claims.

use std::collections::HashSet;

use chrono::Duration;
use proptest::prelude::*;

use hap_core::compact::decode;
use hap_core::{
    is_valid_compact, is_valid_id, sign_compact, sign_full, verify_compact, verify_jws, Claim,
    ClaimId, IdPolicy, KeyRecord, Keypair, ParsedJws, RevocationStatus, VerificationContext,
    VerifyError, WellKnownKeySet,
};
use hap_testkit::generators::{claim, claim_from_params, keypair, party_name, ClaimParams};

fn active(_: &Claim) -> RevocationStatus {
    RevocationStatus::Active
}

fn keys_for(issuer: &str, keypair: &Keypair) -> WellKnownKeySet {
    WellKnownKeySet::with_keys(issuer, [KeyRecord::new("key_001", keypair.public_key())])
}

/// `s` with the character at `i` replaced, or `None` if that changes nothing.
fn replace_char(s: &str, i: usize, replacement: &str) -> Option<String> {
    (&s[i..=i] != replacement).then(|| format!("{}{}{}", &s[..i], replacement, &s[i + 1..]))
}

fn ctx_for<'a>(claim: &'a Claim, keys: &'a WellKnownKeySet) -> VerificationContext<'a> {
    VerificationContext {
        keys,
        issuer_domain: &claim.issuer,
        now: claim.issued_at,
    }
}

proptest! {
    #[test]
    fn full_form_round_trips(params: ClaimParams, kp in keypair()) {
        let claim = claim_from_params(&params).unwrap();
        let keys = keys_for(&claim.issuer, &kp);
        let jws = sign_full(&claim, &kp, "key_001").unwrap();

        let verified = verify_jws(&jws, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active).unwrap();
        prop_assert_eq!(verified.claim, claim);
    }

    #[test]
    fn compact_form_round_trips(claim in claim(), kp in keypair()) {
        let keys = keys_for(&claim.issuer, &kp);
        let compact = sign_compact(&claim, &kp).unwrap();
        prop_assert_eq!(compact.split('.').count(), 10);

        let verified =
            verify_compact(&compact, None, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active)
                .unwrap();
        prop_assert_eq!(verified.claim, claim.compact_view());
    }

    #[test]
    fn any_single_character_change_is_rejected(
        claim in claim(),
        kp in keypair(),
        pos in any::<prop::sample::Index>(),
        replacement in "[A-Za-z0-9_%.-]",
    ) {
        let keys = keys_for(&claim.issuer, &kp);
        let compact = sign_compact(&claim, &kp).unwrap();
        let Some(tampered) = replace_char(&compact, pos.index(compact.len()), &replacement) else {
            return Ok(());
        };

        let result =
            verify_compact(&tampered, None, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active);
        if is_valid_compact(&tampered) && decode(&tampered).is_ok() {
            prop_assert_eq!(result, Err(VerifyError::SignatureInvalid), "{}", tampered);
        } else {
            let structural = result.as_ref().is_err_and(VerifyError::is_structural);
            prop_assert!(structural, "{} gave {:?}", tampered, result);
        }
    }

    #[test]
    fn compact_signature_change_fails_signature_stage(
        claim in claim(),
        kp in keypair(),
        pos in any::<prop::sample::Index>(),
        replacement in "[A-Za-z0-9_-]",
    ) {
        let keys = keys_for(&claim.issuer, &kp);
        let compact = sign_compact(&claim, &kp).unwrap();
        let start = compact.rfind('.').unwrap() + 1;
        let i = start + pos.index(compact.len() - start);
        let Some(tampered) = replace_char(&compact, i, &replacement) else {
            return Ok(());
        };

        let result =
            verify_compact(&tampered, None, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active);
        prop_assert_eq!(result, Err(VerifyError::SignatureInvalid), "{}", tampered);
    }

    #[test]
    fn jws_signature_change_fails_signature_stage(
        params: ClaimParams,
        kp in keypair(),
        pos in any::<prop::sample::Index>(),
        replacement in "[A-Za-z0-9_-]",
    ) {
        let claim = claim_from_params(&params).unwrap();
        let keys = keys_for(&claim.issuer, &kp);
        let jws = sign_full(&claim, &kp, "key_001").unwrap();
        let start = jws.rfind('.').unwrap() + 1;
        let i = start + pos.index(jws.len() - start);
        let Some(tampered) = replace_char(&jws, i, &replacement) else {
            return Ok(());
        };

        let result = verify_jws(&tampered, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active);
        prop_assert_eq!(result, Err(VerifyError::SignatureInvalid), "{}", tampered);
    }

    #[test]
    fn jws_payload_change_is_rejected(
        params: ClaimParams,
        kp in keypair(),
        pos in any::<prop::sample::Index>(),
        replacement in "[A-Za-z0-9_-]",
    ) {
        let claim = claim_from_params(&params).unwrap();
        let keys = keys_for(&claim.issuer, &kp);
        let jws = sign_full(&claim, &kp, "key_001").unwrap();
        let start = jws.find('.').unwrap() + 1;
        let end = jws.rfind('.').unwrap();
        let i = start + pos.index(end - start);
        let Some(tampered) = replace_char(&jws, i, &replacement) else {
            return Ok(());
        };

        let result = verify_jws(&tampered, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active);
        let parses = ParsedJws::parse(&tampered).and_then(|parsed| parsed.claim()).is_ok();
        if parses {
            prop_assert_eq!(result, Err(VerifyError::SignatureInvalid), "{}", tampered);
        } else {
            let structural = result.as_ref().is_err_and(VerifyError::is_structural);
            prop_assert!(structural, "{} gave {:?}", tampered, result);
        }
    }

    #[test]
    fn issuer_relabel_is_rejected(claim in claim(), kp in keypair()) {
        // The issuer's real key, served for another domain.
        let keys = keys_for("attacker.example", &kp);
        let jws = sign_full(&claim, &kp, "key_001").unwrap();
        let ctx = VerificationContext {
            keys: &keys,
            issuer_domain: "attacker.example",
            now: claim.issued_at,
        };
        prop_assume!(claim.issuer != "attacker.example");

        let is_mismatch = matches!(
            verify_jws(&jws, &ctx, IdPolicy::ProductionOnly, active),
            Err(VerifyError::IssuerMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }

    #[test]
    fn expiry_boundary(params: ClaimParams, kp in keypair()) {
        let claim = claim_from_params(&params).unwrap();
        let Some(exp) = claim.expires_at else {
            return Ok(());
        };
        let keys = keys_for(&claim.issuer, &kp);
        let compact = sign_compact(&claim, &kp).unwrap();
        let at = |now| VerificationContext {
            keys: &keys,
            issuer_domain: &claim.issuer,
            now,
        };

        let before = verify_compact(&compact, None, &at(exp - Duration::microseconds(1)), IdPolicy::ProductionOnly, active);
        prop_assert!(before.is_ok());

        let at_exp = verify_compact(&compact, None, &at(exp), IdPolicy::ProductionOnly, active);
        prop_assert_eq!(at_exp, Err(VerifyError::Expired { expired_at: exp }));
    }

    #[test]
    fn names_survive_compact_encoding(name in party_name(), kp in keypair()) {
        let claim = Claim::builder(ClaimId::generate(), "ballista.jobs")
            .human_effort(hap_core::Method::Referral, hap_core::Party::new(name.as_str()))
            .build()
            .unwrap();
        let keys = keys_for("ballista.jobs", &kp);
        let compact = sign_compact(&claim, &kp).unwrap();
        prop_assert_eq!(compact.split('.').count(), 10);

        let verified =
            verify_compact(&compact, None, &ctx_for(&claim, &keys), IdPolicy::ProductionOnly, active)
                .unwrap();
        prop_assert_eq!(verified.claim.body.party().name.as_str(), name.as_str());
    }
}

#[test]
fn ten_thousand_ids_are_unique_and_well_formed() {
    let ids: HashSet<ClaimId> = (0..10_000).map(|_| ClaimId::generate()).collect();
    assert_eq!(ids.len(), 10_000);
    assert!(ids.iter().all(|id| is_valid_id(id.as_str())));
    assert!(ids.iter().all(|id| !id.is_test()));
}

#[test]
fn scenario_expired_one_second_ago() {
    let v = &hap_testkit::all_vectors()[1];
    let exp = v.expires_at().unwrap().unwrap();
    let keys = WellKnownKeySet::with_keys(v.issuer, [KeyRecord::new(v.kid, v.keypair().public_key())]);
    let ctx = VerificationContext {
        keys: &keys,
        issuer_domain: v.issuer,
        now: exp + Duration::seconds(1),
    };
    assert_eq!(
        verify_jws(v.expected_jws, &ctx, IdPolicy::ProductionOnly, active),
        Err(VerifyError::Expired { expired_at: exp })
    );
}
