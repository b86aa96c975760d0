//! Source traits: where a verifier gets issuer keys and revocation status.
//!
//! Both are external data. Implementations may use HTTP, a cache, or a
//! fixed table; the verifier only sees these traits.

use async_trait::async_trait;
use hap_core::{ClaimId, RevocationStatus, WellKnownKeySet};

use crate::error::Result;

/// Fetches an issuer's published key set.
///
/// Implementations must be thread-safe (Send + Sync). A single call makes
/// at most one attempt; the caller bounds it with a timeout.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the key set published by `issuer`.
    ///
    /// # Returns
    /// - The key set, in publication order.
    /// - `IssuerNotFound` if the issuer publishes nothing.
    /// - `TransportFailure` if the issuer could not be reached.
    async fn fetch_keys(&self, issuer: &str) -> Result<WellKnownKeySet>;
}

/// Reports whether an issuer has revoked a claim.
#[async_trait]
pub trait RevocationSource: Send + Sync {
    /// Revocation status of claim `id` at `issuer`. Unknown claims are
    /// `Active`.
    async fn revocation_status(&self, issuer: &str, id: &ClaimId) -> Result<RevocationStatus>;
}

/// Both sources at once, which is what a verifier needs.
pub trait Directory: KeySource + RevocationSource {}

impl<T: KeySource + RevocationSource> Directory for T {}
