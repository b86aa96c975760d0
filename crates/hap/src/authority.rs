//! The issuing side: a Verification Authority that signs claims.

use std::sync::Arc;

use chrono::Duration;
use hap_core::{
    build_verification_url, export_public_key, sign_compact, sign_full, Claim, ClaimBuilder,
    ClaimId, KeyRecord, Keypair, PublicKey, WellKnownKeySet,
};

use crate::clock::{Clock, SystemClock};
use crate::error::{HapError, Result};

/// Configuration for an [`Authority`].
#[derive(Debug, Clone, Default)]
pub struct AuthorityConfig {
    /// Lifetime given to new claims. `None` issues claims that never expire.
    pub default_ttl: Option<Duration>,
    /// Tier stamped on new claims.
    pub default_tier: Option<String>,
}

/// A Verification Authority: one issuer domain, one active signing key.
///
/// Provides:
/// - Claim builders with fresh ids and the current time
/// - Signing in both wire forms
/// - The public key record to publish
pub struct Authority {
    issuer: String,
    keypair: Keypair,
    kid: String,
    config: AuthorityConfig,
    clock: Arc<dyn Clock>,
}

impl Authority {
    pub fn new(
        issuer: impl Into<String>,
        keypair: Keypair,
        kid: impl Into<String>,
        config: AuthorityConfig,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            keypair,
            kid: kid.into(),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for `issued_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The record to publish for the active key.
    pub fn key_record(&self) -> KeyRecord {
        export_public_key(&self.keypair.public_key(), self.kid.as_str())
    }

    /// A key set holding only the active key.
    pub fn key_set(&self) -> WellKnownKeySet {
        WellKnownKeySet::with_keys(self.issuer.as_str(), [self.key_record()])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a claim with a fresh production id, issued now.
    pub fn claim(&self) -> ClaimBuilder {
        self.builder(ClaimId::generate())
    }

    /// Start a claim in the test id namespace.
    pub fn test_claim(&self) -> ClaimBuilder {
        self.builder(ClaimId::generate_test())
    }

    fn builder(&self, id: ClaimId) -> ClaimBuilder {
        let mut builder = Claim::builder(id, self.issuer.as_str()).issued_at(self.clock.now());
        if let Some(ttl) = self.config.default_ttl {
            builder = builder.expires_in(ttl);
        }
        if let Some(tier) = &self.config.default_tier {
            builder = builder.tier(tier.as_str());
        }
        builder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────────────────────

    fn check_issuer(&self, claim: &Claim) -> Result<()> {
        if claim.issuer != self.issuer {
            return Err(HapError::ForeignIssuer {
                authority: self.issuer.clone(),
                claim: claim.issuer.clone(),
            });
        }
        Ok(())
    }

    /// Sign the full form.
    pub fn issue_jws(&self, claim: &Claim) -> Result<String> {
        self.check_issuer(claim)?;
        let jws = sign_full(claim, &self.keypair, &self.kid)?;
        tracing::info!(
            claim_id = %claim.id,
            issuer = %self.issuer,
            kid = %self.kid,
            shape = %claim.shape(),
            "issued claim"
        );
        Ok(jws)
    }

    /// Sign the compact form.
    pub fn issue_compact(&self, claim: &Claim) -> Result<String> {
        self.check_issuer(claim)?;
        let compact = sign_compact(claim, &self.keypair)?;
        tracing::info!(
            claim_id = %claim.id,
            issuer = %self.issuer,
            shape = %claim.shape(),
            "issued compact claim"
        );
        Ok(compact)
    }

    /// Sign the compact form and wrap it in a verification URL.
    pub fn issue_url(&self, base: &str, claim: &Claim) -> Result<String> {
        Ok(build_verification_url(base, &self.issue_compact(claim)?))
    }
}
