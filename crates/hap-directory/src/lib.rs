//! # HAP Directory
//!
//! Where verifiers get issuer data: the [`KeySource`] and
//! [`RevocationSource`] traits, records for the documents issuers publish,
//! and an in-memory implementation.
//!
//! ## Key Types
//!
//! - [`KeySource`] - Fetches an issuer's key set
//! - [`RevocationSource`] - Reports revocation status for a claim
//! - [`MemoryDirectory`] - In-process implementation of both
//! - [`VerificationResponse`] - Body of an issuer's verification API
//!
//! ## Design Notes
//!
//! - **Single attempt**: sources never retry; the verifier bounds each
//!   call with a timeout.
//! - **Issuer binding**: a key set must declare the domain it was fetched
//!   for (see [`validate_key_set`]).

pub mod error;
pub mod memory;
pub mod traits;
pub mod well_known;

pub use error::{DirectoryError, Result};
pub use memory::MemoryDirectory;
pub use traits::{Directory, KeySource, RevocationSource};
pub use well_known::{
    parse_key_set, validate_key_set, verify_api_url, well_known_url, VerificationResponse,
};
