//! The consuming side: verify claims against issuer-published keys.

use std::sync::Arc;
use std::time::Duration;

use hap_core::verify::check_revocation;
use hap_core::{
    extract_compact, ClaimForm, Disclosure, IdPolicy, RevocationStatus, Stage, UnverifiedClaim,
    VerificationContext, VerificationRecord, Verified, VerifyError, WellKnownKeySet,
};
use hap_directory::{validate_key_set, Directory, DirectoryError};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{HapError, Result};

/// How a compact claim's signing key is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompactKeySelection {
    /// Try every key in publication order; the first that verifies wins.
    #[default]
    Scan,
    /// Use the key with this `kid`.
    Kid(String),
}

/// Configuration for a [`Verifier`].
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Upper bound on each directory call.
    pub fetch_timeout: Duration,
    /// Accept ids in the `hap_test_` namespace.
    pub allow_test_claims: bool,
    /// Whether to consult the revocation source after the other stages pass.
    pub check_revocation: bool,
    /// Detail level of records produced by [`VerificationReport::to_record`].
    pub disclosure: Disclosure,
    /// Key choice for compact claims.
    pub compact_kid: CompactKeySelection,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            allow_test_claims: false,
            check_revocation: true,
            disclosure: Disclosure::Opaque,
            compact_kid: CompactKeySelection::Scan,
        }
    }
}

impl VerifierConfig {
    fn id_policy(&self) -> IdPolicy {
        if self.allow_test_claims {
            IdPolicy::AllowTest
        } else {
            IdPolicy::ProductionOnly
        }
    }
}

/// The outcome of verifying one claim.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    form: ClaimForm,
    outcome: Result<Verified>,
    disclosure: Disclosure,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn form(&self) -> ClaimForm {
        self.form
    }

    pub fn verified(&self) -> Option<&Verified> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&HapError> {
        self.outcome.as_ref().err()
    }

    /// The first stage that failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.error().and_then(HapError::stage)
    }

    pub fn into_result(self) -> Result<Verified> {
        self.outcome
    }

    /// `{valid, claim?, error?}` at the verifier's configured disclosure.
    pub fn to_record(&self) -> VerificationRecord {
        self.to_record_with(self.disclosure)
    }

    /// `{valid, claim?, error?}` at an explicit disclosure level.
    pub fn to_record_with(&self, disclosure: Disclosure) -> VerificationRecord {
        match &self.outcome {
            Ok(verified) => VerificationRecord::from_outcome(&Ok(verified.clone()), disclosure),
            Err(HapError::Verify(e)) => VerificationRecord::from_outcome(&Err(e.clone()), disclosure),
            Err(other) => VerificationRecord {
                valid: false,
                claim: None,
                error: Some(match disclosure {
                    Disclosure::Opaque => hap_core::verify::OPAQUE_ERROR.to_owned(),
                    Disclosure::Detailed => other.code().to_owned(),
                }),
            },
        }
    }
}

/// Verifies claims using a [`Directory`] for keys and revocation status.
///
/// Structure is checked before anything is fetched, so malformed claims
/// never cost a network round trip.
pub struct Verifier<D: Directory> {
    directory: Arc<D>,
    clock: Arc<dyn Clock>,
    config: VerifierConfig,
}

impl<D: Directory> Verifier<D> {
    pub fn new(directory: Arc<D>, config: VerifierConfig) -> Self {
        Self {
            directory,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Verify a full-form (JWS) claim.
    pub async fn verify_jws(&self, jws: &str) -> VerificationReport {
        let unverified = UnverifiedClaim::from_jws(jws, self.config.id_policy());
        self.report(ClaimForm::Full, self.run(unverified).await)
    }

    /// Verify a compact claim using the configured key selection.
    pub async fn verify_compact(&self, compact: &str) -> VerificationReport {
        let kid = match &self.config.compact_kid {
            CompactKeySelection::Scan => None,
            CompactKeySelection::Kid(kid) => Some(kid.as_str()),
        };
        self.verify_compact_with_kid(compact, kid).await
    }

    /// Verify a compact claim with an explicit `kid`, or a scan if `None`.
    pub async fn verify_compact_with_kid(
        &self,
        compact: &str,
        kid: Option<&str>,
    ) -> VerificationReport {
        let unverified = UnverifiedClaim::from_compact(compact, kid, self.config.id_policy());
        self.report(ClaimForm::Compact, self.run(unverified).await)
    }

    /// Verify the compact claim carried in a verification URL.
    pub async fn verify_url(&self, url: &str) -> VerificationReport {
        match extract_compact(url) {
            Some(compact) => self.verify_compact(&compact).await,
            None => {
                let err = VerifyError::MalformedCompact("no compact claim in URL".into());
                warn!(stage = Stage::Structure.as_str(), error = %err, "rejected claim");
                self.report(ClaimForm::Compact, Err(err.into()))
            }
        }
    }

    fn report(&self, form: ClaimForm, outcome: Result<Verified>) -> VerificationReport {
        VerificationReport {
            form,
            outcome,
            disclosure: self.config.disclosure,
        }
    }

    async fn run(&self, unverified: std::result::Result<UnverifiedClaim, VerifyError>) -> Result<Verified> {
        let unverified = unverified.map_err(|e| {
            warn!(stage = Stage::Structure.as_str(), error = %e, "rejected claim");
            e
        })?;

        let claim_id = unverified.claim().id.clone();
        let issuer = unverified.claim().issuer.clone();
        debug!(%claim_id, %issuer, kid = ?unverified.kid(), "claim structurally valid");

        let result = self.verify_with_directory(unverified, &issuer).await;
        match &result {
            Ok(verified) => debug!(%claim_id, %issuer, kid = %verified.kid, "claim accepted"),
            Err(e) => warn!(
                %claim_id,
                %issuer,
                stage = e.stage().map(Stage::as_str).unwrap_or("unknown"),
                error = %e,
                "rejected claim"
            ),
        }
        result
    }

    async fn verify_with_directory(
        &self,
        unverified: UnverifiedClaim,
        issuer: &str,
    ) -> Result<Verified> {
        let keys = self.fetch_keys(issuer).await?;
        debug!(issuer, keys = keys.len(), "fetched key set");

        let ctx = VerificationContext {
            keys: &keys,
            issuer_domain: issuer,
            now: self.clock.now(),
        };
        let claim_id = unverified.claim().id.clone();
        let verified = unverified.verify_through_expiry(&ctx, |stage| {
            debug!(%claim_id, issuer, stage = stage.as_str(), "stage passed");
        })?;

        // Revocation is fetched only once the claim has passed every
        // other stage.
        if self.config.check_revocation {
            let status = self.fetch_revocation(issuer, &verified).await?;
            check_revocation(&status)?;
            debug!(%claim_id, issuer, stage = Stage::Revocation.as_str(), "stage passed");
        } else {
            debug!(%claim_id, issuer, "revocation check disabled");
        }
        Ok(verified)
    }

    async fn fetch_keys(&self, issuer: &str) -> Result<WellKnownKeySet> {
        let keys = tokio::time::timeout(self.config.fetch_timeout, self.directory.fetch_keys(issuer))
            .await
            .map_err(|_| self.timeout(issuer))??;
        validate_key_set(issuer, &keys)?;
        Ok(keys)
    }

    async fn fetch_revocation(&self, issuer: &str, verified: &Verified) -> Result<RevocationStatus> {
        let status = tokio::time::timeout(
            self.config.fetch_timeout,
            self.directory.revocation_status(issuer, &verified.claim.id),
        )
        .await
        .map_err(|_| self.timeout(issuer))??;
        Ok(status)
    }

    fn timeout(&self, issuer: &str) -> DirectoryError {
        DirectoryError::Timeout {
            issuer: issuer.to_owned(),
            timeout: self.config.fetch_timeout,
        }
    }
}
