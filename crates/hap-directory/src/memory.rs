//! In-memory directory.
//!
//! Holds key sets and revocations in process. Used in tests and by
//! verifiers that pin their trusted issuers up front. Issuers can be
//! marked unreachable, or given artificial latency, to exercise the
//! failure paths of a verifier.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hap_core::{ClaimId, KeyRecord, RevocationReason, RevocationStatus, WellKnownKeySet};

use crate::error::{DirectoryError, Result};
use crate::traits::{KeySource, RevocationSource};

/// In-memory key and revocation source. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: RwLock<MemoryDirectoryInner>,
}

#[derive(Default)]
struct MemoryDirectoryInner {
    /// Key sets indexed by issuer domain.
    key_sets: HashMap<String, WellKnownKeySet>,

    /// Revocations indexed by (issuer, claim id).
    revocations: HashMap<(String, ClaimId), RevocationStatus>,

    /// Issuers whose fetches fail with a transport error.
    unreachable: HashSet<String>,

    /// Delay applied before every fetch.
    latency: Option<Duration>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryDirectoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryDirectoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a key set under the issuer it declares, replacing any
    /// earlier one.
    pub fn publish(&self, key_set: WellKnownKeySet) {
        tracing::debug!(issuer = key_set.issuer(), keys = key_set.len(), "publishing key set");
        self.write()
            .key_sets
            .insert(key_set.issuer().to_owned(), key_set);
    }

    /// Publish a key set under a domain other than the one it declares.
    /// Verifiers must refuse such documents.
    pub fn publish_as(&self, domain: impl Into<String>, key_set: WellKnownKeySet) {
        self.write().key_sets.insert(domain.into(), key_set);
    }

    /// Add a key to an issuer's set, creating the set if needed.
    pub fn add_key(&self, issuer: &str, key: KeyRecord) {
        self.write()
            .key_sets
            .entry(issuer.to_owned())
            .or_insert_with(|| WellKnownKeySet::new(issuer))
            .push(key);
    }

    pub fn revoke(
        &self,
        issuer: &str,
        id: &ClaimId,
        reason: Option<RevocationReason>,
        revoked_at: Option<DateTime<Utc>>,
    ) {
        tracing::debug!(issuer, claim_id = %id, ?reason, "recording revocation");
        self.write().revocations.insert(
            (issuer.to_owned(), id.clone()),
            RevocationStatus::Revoked { reason, revoked_at },
        );
    }

    pub fn set_unreachable(&self, issuer: &str, unreachable: bool) {
        let mut inner = self.write();
        if unreachable {
            inner.unreachable.insert(issuer.to_owned());
        } else {
            inner.unreachable.remove(issuer);
        }
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.write().latency = latency;
    }

    async fn simulate_transport(&self, issuer: &str) -> Result<()> {
        let (latency, unreachable) = {
            let inner = self.read();
            (inner.latency, inner.unreachable.contains(issuer))
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if unreachable {
            return Err(DirectoryError::TransportFailure {
                issuer: issuer.to_owned(),
                reason: "issuer marked unreachable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeySource for MemoryDirectory {
    async fn fetch_keys(&self, issuer: &str) -> Result<WellKnownKeySet> {
        self.simulate_transport(issuer).await?;
        self.read()
            .key_sets
            .get(issuer)
            .cloned()
            .ok_or_else(|| DirectoryError::IssuerNotFound(issuer.to_owned()))
    }
}

#[async_trait]
impl RevocationSource for MemoryDirectory {
    async fn revocation_status(&self, issuer: &str, id: &ClaimId) -> Result<RevocationStatus> {
        self.simulate_transport(issuer).await?;
        Ok(self
            .read()
            .revocations
            .get(&(issuer.to_owned(), id.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hap_core::Keypair;

    fn record(seed: u8, kid: &str) -> KeyRecord {
        KeyRecord::new(kid, Keypair::from_seed(&[seed; 32]).public_key())
    }

    #[tokio::test]
    async fn publish_and_fetch() {
        let directory = MemoryDirectory::new();
        directory.publish(WellKnownKeySet::with_keys(
            "ballista.jobs",
            [record(1, "key_001")],
        ));

        let keys = directory.fetch_keys("ballista.jobs").await.unwrap();
        assert_eq!(keys.issuer(), "ballista.jobs");
        assert!(keys.get("key_001").is_some());

        let missing = directory.fetch_keys("unknown.example").await;
        assert_eq!(
            missing.unwrap_err(),
            DirectoryError::IssuerNotFound("unknown.example".into())
        );
    }

    #[tokio::test]
    async fn rotation_keeps_old_keys() {
        let directory = MemoryDirectory::new();
        directory.add_key("ballista.jobs", record(1, "key_001"));
        directory.add_key("ballista.jobs", record(2, "key_002"));

        let keys = directory.fetch_keys("ballista.jobs").await.unwrap();
        let kids: Vec<_> = keys.iter().map(KeyRecord::kid).collect();
        assert_eq!(kids, ["key_001", "key_002"]);
    }

    #[tokio::test]
    async fn revocations_are_per_issuer() {
        let directory = MemoryDirectory::new();
        let id = ClaimId::parse("hap_abc123xyz456").unwrap();
        directory.revoke("ballista.jobs", &id, Some(RevocationReason::Fraud), None);

        let status = directory.revocation_status("ballista.jobs", &id).await.unwrap();
        assert!(status.is_revoked());

        let other = directory.revocation_status("other.example", &id).await.unwrap();
        assert_eq!(other, RevocationStatus::Active);
    }

    #[tokio::test]
    async fn unreachable_issuer_fails_transport() {
        let directory = MemoryDirectory::new();
        directory.add_key("ballista.jobs", record(1, "key_001"));
        directory.set_unreachable("ballista.jobs", true);

        let err = directory.fetch_keys("ballista.jobs").await.unwrap_err();
        assert_eq!(err.code(), "transport_failure");

        directory.set_unreachable("ballista.jobs", false);
        assert!(directory.fetch_keys("ballista.jobs").await.is_ok());
    }
}
