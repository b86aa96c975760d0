//! Golden test vectors for cross-implementation verification.
//!
//! Every implementation of HAP must produce identical:
//! - public key (from the seed)
//! - canonical JSON
//! - JWS (deterministic Ed25519)
//! - compact claim

use chrono::Duration;
use serde::Serialize;

use hap_core::crypto::base64url_encode;
use hap_core::{
    compact_payload, verify_compact, verify_jws, Claim, CoreError, IdPolicy, KeyRecord, Keypair,
    ParsedJws, RevocationStatus, VerificationContext, VerifyError, WellKnownKeySet,
};
use hap_testkit::vectors::{all_vectors, scenario, verify_all_vectors, GoldenVector};

fn key_set(v: &GoldenVector) -> WellKnownKeySet {
    WellKnownKeySet::with_keys(v.issuer, [KeyRecord::new(v.kid, v.keypair().public_key())])
}

fn active(_: &Claim) -> RevocationStatus {
    RevocationStatus::Active
}

#[test]
fn test_vectors_match() {
    for v in all_vectors() {
        let out = v.derive().unwrap();
        assert_eq!(out.public_key, v.expected_public_key, "public key mismatch for {}", v.name);
        assert_eq!(out.json, v.expected_json, "canonical JSON mismatch for {}", v.name);
        assert_eq!(out.jws, v.expected_jws, "JWS mismatch for {}", v.name);
        assert_eq!(out.compact, v.expected_compact, "compact mismatch for {}", v.name);
    }

    let report = verify_all_vectors().unwrap();
    assert!(report.iter().all(|(_, matches, _)| *matches));
}

#[test]
fn test_vectors_deterministic() {
    let a: Vec<_> = all_vectors().iter().map(|v| v.derive().unwrap()).collect();
    let b: Vec<_> = all_vectors().iter().map(|v| v.derive().unwrap()).collect();
    assert_eq!(a, b);
}

#[test]
fn test_vectors_verify() {
    for v in all_vectors() {
        let keys = key_set(&v);
        let ctx = VerificationContext {
            keys: &keys,
            issuer_domain: v.issuer,
            now: v.issued_at().unwrap(),
        };
        let claim = v.claim().unwrap();

        let full = verify_jws(v.expected_jws, &ctx, IdPolicy::ProductionOnly, active)
            .unwrap_or_else(|e| panic!("JWS of {} rejected: {e}", v.name));
        assert_eq!(full.claim, claim, "full form lost data for {}", v.name);
        assert_eq!(full.kid, v.kid);

        let compact = verify_compact(v.expected_compact, None, &ctx, IdPolicy::ProductionOnly, active)
            .unwrap_or_else(|e| panic!("compact of {} rejected: {e}", v.name));
        assert_eq!(compact.claim, claim.compact_view(), "compact form lost data for {}", v.name);
    }
}

#[test]
fn test_vector_payload_bytes() {
    for v in all_vectors() {
        let parsed = ParsedJws::parse(v.expected_jws).unwrap();
        assert_eq!(parsed.payload(), v.expected_json.as_bytes(), "payload of {}", v.name);
        assert_eq!(parsed.kid(), v.kid);

        let payload = compact_payload(&v.claim().unwrap()).unwrap();
        assert!(v.expected_compact.starts_with(&format!("{payload}.")));
    }
}

#[test]
fn test_scenario_fields() {
    let s = scenario();
    let fields: Vec<&str> = s.expected_compact.split('.').collect();
    assert_eq!(fields.len(), 10);
    assert_eq!(
        &fields[..9],
        [
            "HAP1",
            "hap_abc123xyz456",
            "human_effort",
            "physical_mail",
            "Acme%20Corp",
            "acme%2Ecom",
            "1768802400",
            "0",
            "ballista%2Ejobs",
        ]
    );
    assert_eq!(s.expected_public_key, Keypair::from_seed(&[0x01; 32]).public_key().to_base64url());
    assert_eq!(
        hex::encode(Keypair::from_seed(&s.seed).public_key().as_bytes()),
        "8a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c"
    );
}

#[test]
fn print_golden_vectors_json() {
    #[derive(Serialize)]
    struct VectorFile {
        version: &'static str,
        description: &'static str,
        vectors: Vec<hap_testkit::VectorOutput>,
    }

    let file = VectorFile {
        version: hap_core::PROTOCOL_VERSION,
        description: "Golden test vectors for HAP. Every implementation must produce identical outputs.",
        vectors: all_vectors().iter().map(|v| v.derive().unwrap()).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&file).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────
// Rejection vectors
// ─────────────────────────────────────────────────────────────────────────

fn scenario_ctx(keys: &WellKnownKeySet) -> VerificationContext<'_> {
    VerificationContext {
        keys,
        issuer_domain: "ballista.jobs",
        now: scenario().issued_at().unwrap(),
    }
}

#[test]
fn test_reject_tampered_compact() {
    let s = scenario();
    let keys = key_set(&s);
    let tampered = s.expected_compact.replace("Acme%20Corp", "Acme%20Corq");
    assert_eq!(
        verify_compact(&tampered, None, &scenario_ctx(&keys), IdPolicy::ProductionOnly, active),
        Err(VerifyError::SignatureInvalid)
    );
}

#[test]
fn test_reject_wrong_key() {
    let s = scenario();
    let keys = WellKnownKeySet::with_keys(
        "ballista.jobs",
        [KeyRecord::new("key_001", Keypair::from_seed(&[0x09; 32]).public_key())],
    );
    let ctx = scenario_ctx(&keys);
    assert_eq!(
        verify_compact(s.expected_compact, None, &ctx, IdPolicy::ProductionOnly, active),
        Err(VerifyError::SignatureInvalid)
    );
    assert_eq!(
        verify_jws(s.expected_jws, &ctx, IdPolicy::ProductionOnly, active),
        Err(VerifyError::SignatureInvalid)
    );
}

#[test]
fn test_reject_issuer_relabel() {
    // The right key, but fetched for a different domain.
    let s = scenario();
    let keys = key_set(&s);
    let ctx = VerificationContext {
        issuer_domain: "evil.example",
        ..scenario_ctx(&keys)
    };
    assert!(matches!(
        verify_jws(s.expected_jws, &ctx, IdPolicy::ProductionOnly, active),
        Err(VerifyError::IssuerMismatch { .. })
    ));
}

#[test]
fn test_reject_expired() {
    let v = &all_vectors()[1];
    let exp = v.expires_at().unwrap().unwrap();
    let keys = key_set(v);
    let at = |now| VerificationContext {
        keys: &keys,
        issuer_domain: v.issuer,
        now,
    };

    let just_before = at(exp - Duration::seconds(1));
    assert!(
        verify_compact(v.expected_compact, None, &just_before, IdPolicy::ProductionOnly, active)
            .is_ok()
    );
    assert_eq!(
        verify_compact(v.expected_compact, None, &at(exp), IdPolicy::ProductionOnly, active),
        Err(VerifyError::Expired { expired_at: exp })
    );
}

#[test]
fn test_reject_future_version() {
    let s = scenario();
    let keys = key_set(&s);
    let hap2 = s.expected_compact.replacen("HAP1", "HAP2", 1);
    assert!(matches!(
        verify_compact(&hap2, None, &scenario_ctx(&keys), IdPolicy::ProductionOnly, active),
        Err(VerifyError::UnsupportedVersion(_))
    ));
}

#[test]
fn test_reject_legacy_layout() {
    let s = scenario();
    let keys = key_set(&s);
    let legacy = s.expected_compact.replacen(".human_effort.", ".", 1);
    assert_eq!(legacy.split('.').count(), 9);
    assert!(matches!(
        verify_compact(&legacy, None, &scenario_ctx(&keys), IdPolicy::ProductionOnly, active),
        Err(VerifyError::UnsupportedVersion(_))
    ));
}

#[test]
fn test_reject_test_id_in_compact() {
    let s = scenario();
    let keys = key_set(&s);
    let test_id = s.expected_compact.replacen("hap_abc123xyz456", "hap_test_abcd1234", 1);
    assert!(matches!(
        verify_compact(&test_id, None, &scenario_ctx(&keys), IdPolicy::AllowTest, active),
        Err(VerifyError::MalformedCompact(_))
    ));
}

#[test]
fn test_reject_non_eddsa_header() {
    let s = scenario();
    let keys = key_set(&s);
    let segments: Vec<&str> = s.expected_jws.split('.').collect();
    let header = base64url_encode(br#"{"alg":"HS256","kid":"key_001"}"#);
    let forged = format!("{header}.{}.{}", segments[1], segments[2]);

    assert!(matches!(
        ParsedJws::parse(&forged),
        Err(CoreError::MalformedJws(_))
    ));
    assert!(matches!(
        verify_jws(&forged, &scenario_ctx(&keys), IdPolicy::ProductionOnly, active),
        Err(VerifyError::MalformedJws(_))
    ));
}

#[test]
fn test_reject_unknown_kid() {
    let s = scenario();
    let keys = WellKnownKeySet::with_keys(
        "ballista.jobs",
        [KeyRecord::new("key_002", s.keypair().public_key())],
    );
    assert_eq!(
        verify_jws(s.expected_jws, &scenario_ctx(&keys), IdPolicy::ProductionOnly, active),
        Err(VerifyError::KeyNotFound { kid: "key_001".into() })
    );
}

#[test]
fn test_reject_flipped_final_signature_character() {
    let s = scenario();
    let keys = key_set(&s);
    let ctx = scenario_ctx(&keys);

    // The compact signature ends in `w`. `x` changes only the four unused
    // bits; `B` and `A` change the last byte as well.
    assert!(s.expected_compact.ends_with('w'));
    for replacement in ['x', 'B', 'A'] {
        let compact = format!(
            "{}{replacement}",
            &s.expected_compact[..s.expected_compact.len() - 1]
        );
        assert_ne!(compact, s.expected_compact);
        assert_eq!(
            verify_compact(&compact, None, &ctx, IdPolicy::ProductionOnly, active),
            Err(VerifyError::SignatureInvalid),
            "{compact}"
        );

        let jws = format!("{}{replacement}", &s.expected_jws[..s.expected_jws.len() - 1]);
        if jws != s.expected_jws {
            assert_eq!(
                verify_jws(&jws, &ctx, IdPolicy::ProductionOnly, active),
                Err(VerifyError::SignatureInvalid),
                "{jws}"
            );
        }
    }
}
