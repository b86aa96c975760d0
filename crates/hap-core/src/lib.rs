//! # HAP Core
//!
//! Pure primitives for the Human Attestation Protocol: claim ids, the claim
//! model, canonical payloads, Ed25519 signing, the compact codec and the
//! staged verification engine.
//!
//! This crate does no I/O and never reads the clock. Key sets, revocation
//! status and the current time are all supplied by the caller.
//!
//! ## Key Types
//!
//! - [`Claim`] - A signed statement of costly sender effort
//! - [`ClaimId`] - `hap_` plus 12 random alphanumerics
//! - [`WellKnownKeySet`] - An issuer's published keys, addressed by `kid`
//! - [`UnverifiedClaim`] - A parsed claim waiting for key material
//!
//! ## Wire Forms
//!
//! Full-form claims travel as compact JWS over canonical JSON (see
//! [`jws`]); compact claims are ten `.`-separated fields (see [`compact`]).
//! Both byte layouts are defined in [`canonical`].

pub mod canonical;
pub mod claim;
pub mod compact;
pub mod crypto;
pub mod error;
pub mod id;
pub mod jws;
pub mod keys;
pub mod verify;

pub use canonical::{canonical_json, compact_payload, CompactSlots};
pub use claim::{
    is_claim_expired, is_claim_for_recipient, Claim, ClaimBody, ClaimBuilder, ClaimShape,
    CommitmentLevel, Cost, Effort, Method, Party, PROTOCOL_VERSION,
};
pub use compact::{build_verification_url, extract_compact, is_valid_compact, sign_compact};
pub use crypto::{hash_content, Keypair, PublicKey, Signature, SignatureSegment};
pub use error::{CoreError, Result, Stage, VerifyError};
pub use id::{extract_id_from_url, is_test_id, is_valid_id, ClaimId};
pub use jws::{sign_full, ParsedJws};
pub use keys::{export_public_key, KeyRecord, WellKnownKeySet};
pub use verify::{
    verify_compact, verify_jws, ClaimForm, Disclosure, IdPolicy, RevocationReason,
    RevocationStatus, UnverifiedClaim, VerificationContext, VerificationRecord, Verified,
};
