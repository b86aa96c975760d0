//! # HAP
//!
//! The Human Attestation Protocol: portable, signed claims that a sender
//! performed a costly, verifiable action directed at a specific recipient.
//!
//! ## Overview
//!
//! - **Authority**: an issuer domain that builds and signs claims, and
//!   publishes its public keys
//! - **Verifier**: fetches an issuer's keys through a directory and runs
//!   the staged verification pipeline
//! - **Claims** travel either as a JWS over canonical JSON, or as a
//!   compact dotted string small enough for a QR code
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hap::{Authority, AuthorityConfig, Verifier, VerifierConfig};
//! use hap::core::{Keypair, Method, Party};
//! use hap::directory::MemoryDirectory;
//!
//! async fn example() -> hap::Result<()> {
//!     let authority = Authority::new(
//!         "ballista.jobs",
//!         Keypair::generate(),
//!         "key_001",
//!         AuthorityConfig::default(),
//!     );
//!
//!     let claim = authority
//!         .claim()
//!         .human_effort(Method::PhysicalMail, Party::with_domain("Acme Corp", "acme.com"))
//!         .expires_in_days(730)
//!         .build()?;
//!     let compact = authority.issue_compact(&claim)?;
//!
//!     let directory = Arc::new(MemoryDirectory::new());
//!     directory.publish(authority.key_set());
//!
//!     let verifier = Verifier::new(directory, VerifierConfig::default());
//!     let report = verifier.verify_compact(&compact).await;
//!     assert!(report.is_valid());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `hap::core` - Claims, codecs, signing and the verification engine
//! - `hap::directory` - Key and revocation sources

pub mod authority;
pub mod clock;
pub mod error;
pub mod verifier;

pub use hap_core as core;
pub use hap_directory as directory;

pub use authority::{Authority, AuthorityConfig};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{HapError, Result};
pub use verifier::{CompactKeySelection, VerificationReport, Verifier, VerifierConfig};

pub use hap_core::{
    Claim, ClaimBody, ClaimForm, ClaimId, ClaimShape, CommitmentLevel, Disclosure, Keypair,
    Method, Party, RevocationReason, Stage, VerificationRecord, Verified, VerifyError,
};
