//! Full-form claims as compact JWS.
//!
//! `base64url(header).base64url(payload).base64url(signature)`, unpadded,
//! with header `{"alg":"EdDSA","kid":...}` and the canonical claim JSON as
//! payload. The signature covers the ASCII bytes of the first two
//! segments joined by `.`.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_json;
use crate::claim::Claim;
use crate::crypto::{base64url_decode, base64url_encode, Keypair, PublicKey, SignatureSegment};
use crate::error::{CoreError, Result};

/// The only algorithm HAP signs with.
pub const JWS_ALG: &str = "EdDSA";

/// JWS protected header. Field order is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    pub kid: String,
}

/// Sign a claim, producing a compact JWS.
pub fn sign_full(claim: &Claim, keypair: &Keypair, kid: &str) -> Result<String> {
    claim.validate()?;
    let header = JwsHeader {
        alg: JWS_ALG.to_owned(),
        kid: kid.to_owned(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| CoreError::Encoding(e.to_string()))?;
    let payload = canonical_json(claim)?;

    let signing_input = format!(
        "{}.{}",
        base64url_encode(header_json),
        base64url_encode(payload)
    );
    let signature = keypair.sign(signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", signature.to_base64url()))
}

/// A JWS split into its parts, not yet verified.
#[derive(Debug, Clone)]
pub struct ParsedJws {
    header: JwsHeader,
    signing_input: String,
    payload: Vec<u8>,
    signature: SignatureSegment,
}

impl ParsedJws {
    /// Split and decode a compact JWS. Checks the segment count, the
    /// header algorithm and the signature length; does not touch keys.
    /// A signature with non-zero trailing bits parses and fails later, at
    /// the signature check.
    pub fn parse(jws: &str) -> Result<Self> {
        let mut segments = jws.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(CoreError::MalformedJws("expected three segments".into()));
        };

        let header_bytes = base64url_decode(header_b64)
            .map_err(|e| CoreError::MalformedJws(format!("header: {e}")))?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| CoreError::MalformedJws(format!("header: {e}")))?;
        if header.alg != JWS_ALG {
            return Err(CoreError::MalformedJws(format!(
                "unsupported algorithm '{}'",
                header.alg
            )));
        }

        let payload = base64url_decode(payload_b64)
            .map_err(|e| CoreError::MalformedJws(format!("payload: {e}")))?;
        let signature = SignatureSegment::parse(signature_b64)
            .map_err(|e| CoreError::MalformedJws(format!("signature: {e}")))?;

        Ok(Self {
            header,
            signing_input: format!("{header_b64}.{payload_b64}"),
            payload,
            signature,
        })
    }

    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    pub fn kid(&self) -> &str {
        &self.header.kid
    }

    /// The exact bytes the signature covers, as transmitted.
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &SignatureSegment {
        &self.signature
    }

    /// Decode the payload as a claim. The claim is unauthenticated until
    /// [`ParsedJws::verify_with`] succeeds.
    pub fn claim(&self) -> Result<Claim> {
        Claim::from_json_slice(&self.payload)
    }

    pub fn verify_with(&self, key: &PublicKey) -> Result<()> {
        self.signature.verify(key, self.signing_input())
    }
}
