//! Test fixtures and helpers.
//!
//! A fixture wires one authority, a shared in-memory directory and a
//! verifier to the same fixed clock.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use hap::{Authority, AuthorityConfig, FixedClock, Verifier, VerifierConfig};
use hap_core::{Claim, Keypair, Method, Party, Result};
use hap_directory::MemoryDirectory;

/// Issuer domain used by default fixtures.
pub const FIXTURE_ISSUER: &str = "ballista.jobs";

/// Key id used by default fixtures.
pub const FIXTURE_KID: &str = "key_001";

/// The instant fixture clocks start at: 2026-01-19T06:00:00Z.
pub fn fixture_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_768_802_400, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// An authority whose key set is already published, plus a verifier that
/// reads from the same directory.
pub struct TestFixture {
    pub authority: Authority,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<FixedClock>,
    pub verifier: Verifier<MemoryDirectory>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::build(Keypair::generate(), VerifierConfig::default())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::build(Keypair::from_seed(&seed), VerifierConfig::default())
    }

    /// Create with a deterministic keypair and a custom verifier config.
    pub fn with_config(seed: [u8; 32], config: VerifierConfig) -> Self {
        Self::build(Keypair::from_seed(&seed), config)
    }

    fn build(keypair: Keypair, config: VerifierConfig) -> Self {
        let clock = Arc::new(FixedClock::new(fixture_epoch()));
        let directory = Arc::new(MemoryDirectory::new());
        Self::join(&directory, &clock, FIXTURE_ISSUER, keypair, config)
    }

    /// Add another issuer to an existing directory and clock.
    pub fn join(
        directory: &Arc<MemoryDirectory>,
        clock: &Arc<FixedClock>,
        issuer: &str,
        keypair: Keypair,
        config: VerifierConfig,
    ) -> Self {
        let authority = Authority::new(issuer, keypair, FIXTURE_KID, AuthorityConfig::default())
            .with_clock(clock.clone());
        directory.publish(authority.key_set());
        let verifier = Verifier::new(directory.clone(), config).with_clock(clock.clone());
        Self {
            authority,
            directory: directory.clone(),
            clock: clock.clone(),
            verifier,
        }
    }

    /// A verifier over the same directory and clock with another config.
    pub fn verifier_with(&self, config: VerifierConfig) -> Verifier<MemoryDirectory> {
        Verifier::new(self.directory.clone(), config).with_clock(self.clock.clone())
    }

    /// A physical-mail claim to `name` at `domain`, valid for `days`.
    pub fn mail_claim(&self, name: &str, domain: &str, days: i64) -> Result<Claim> {
        self.authority
            .claim()
            .human_effort(Method::PhysicalMail, Party::with_domain(name, domain))
            .expires_in_days(days)
            .build()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures for `count` issuers sharing one directory and clock.
///
/// Issuer `i` is `issuer{i}.example` with seed `[i; 32]`.
pub fn multi_issuer_fixtures(count: u8) -> Vec<TestFixture> {
    let clock = Arc::new(FixedClock::new(fixture_epoch()));
    let directory = Arc::new(MemoryDirectory::new());
    (0..count)
        .map(|i| {
            TestFixture::join(
                &directory,
                &clock,
                &format!("issuer{i}.example"),
                Keypair::from_seed(&[i; 32]),
                VerifierConfig::default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_round_trip() {
        let fixture = TestFixture::with_seed([7; 32]);
        let claim = fixture.mail_claim("Acme Corp", "acme.com", 730).unwrap();

        let jws = fixture.authority.issue_jws(&claim).unwrap();
        assert!(fixture.verifier.verify_jws(&jws).await.is_valid());

        let compact = fixture.authority.issue_compact(&claim).unwrap();
        assert!(fixture.verifier.verify_compact(&compact).await.is_valid());
    }

    #[tokio::test]
    async fn test_multi_issuer() {
        let issuers = multi_issuer_fixtures(3);
        let pks: Vec<_> = issuers.iter().map(|f| f.authority.public_key()).collect();
        assert_ne!(pks[0], pks[1]);
        assert_ne!(pks[1], pks[2]);

        // Every issuer's claims verify through the shared directory.
        for fixture in &issuers {
            let claim = fixture.mail_claim("Acme", "acme.com", 30).unwrap();
            let compact = fixture.authority.issue_compact(&claim).unwrap();
            assert!(issuers[0].verifier.verify_compact(&compact).await.is_valid());
        }
    }

    #[test]
    fn test_fixture_epoch() {
        assert_eq!(fixture_epoch().to_rfc3339(), "2026-01-19T06:00:00+00:00");
    }
}
