//! # HAP Testkit
//!
//! Testing utilities for the Human Attestation Protocol.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed seeds and claims with the exact bytes every
//!   implementation must produce
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: an authority, directory and verifier on one fixed clock
//!
//! ## Golden Vectors
//!
//! ```rust
//! use hap_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     let out = vector.derive().unwrap();
//!     assert_eq!(out.compact, vector.expected_compact);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use hap_testkit::generators::{claim_from_params, ClaimParams};
//!
//! proptest! {
//!     #[test]
//!     fn canonical_json_is_deterministic(params: ClaimParams) {
//!         let claim = claim_from_params(&params).unwrap();
//!         prop_assert_eq!(
//!             hap_core::canonical_json(&claim).unwrap(),
//!             hap_core::canonical_json(&claim).unwrap()
//!         );
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use hap_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_seed([1; 32]);
//! let claim = fixture.mail_claim("Acme Corp", "acme.com", 730).unwrap();
//! let compact = fixture.authority.issue_compact(&claim).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixture_epoch, multi_issuer_fixtures, TestFixture};
pub use generators::{claim_from_params, ClaimParams};
pub use vectors::{all_vectors, scenario, verify_all_vectors, GoldenVector, VectorOutput};
