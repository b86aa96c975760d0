//! Cryptographic primitives for HAP.
//!
//! Wraps Ed25519 signing with strong types and provides the unpadded
//! base64url encoding used by both wire forms.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

/// Unpadded base64url that also accepts non-zero trailing bits. Only used
/// for received signature segments; see [`SignatureSegment`].
const URL_SAFE_TRAILING_BITS: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| CoreError::Encoding(format!("base64url: {e}")))
}

/// SHA-256 of some content, rendered as `sha256:<hex>`.
pub fn hash_content(content: impl AsRef<[u8]>) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content.as_ref())))
}

/// A 32-byte Ed25519 public key.
///
/// Construction checks that the bytes decode to a curve point, so every
/// `PublicKey` can be used for verification.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        Self::from_bytes(arr)
    }

    pub fn from_base64url(s: &str) -> Result<Self> {
        let bytes = base64url_decode(s).map_err(|_| CoreError::InvalidPublicKey)?;
        Self::from_slice(&bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        base64url_encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }

    /// True if `signature` is valid for `message` under this key.
    pub fn verifies(&self, message: &[u8], signature: &Signature) -> bool {
        self.verify(message, signature).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CoreError::Encoding(format!("signature is {} bytes, expected 64", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn from_base64url(s: &str) -> Result<Self> {
        Self::from_slice(&base64url_decode(s)?)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        base64url_encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

/// A signature segment as received on the wire.
///
/// Any 86-character segment decodes, so a tampered signature is reported
/// by the signature check rather than by the parser. A segment that is not
/// the canonical encoding of its bytes never verifies; otherwise two
/// strings would carry the same signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureSegment {
    signature: Signature,
    canonical: bool,
}

impl SignatureSegment {
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_TRAILING_BITS
            .decode(s)
            .map_err(|e| CoreError::Encoding(format!("base64url: {e}")))?;
        let signature = Signature::from_slice(&bytes)?;
        Ok(Self {
            canonical: signature.to_base64url() == s,
            signature,
        })
    }

    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// False if the segment had non-zero trailing bits.
    pub const fn is_canonical(&self) -> bool {
        self.canonical
    }

    /// Verify the segment over a message.
    pub fn verify(&self, key: &PublicKey, message: &[u8]) -> Result<()> {
        if !self.canonical {
            return Err(CoreError::InvalidSignature);
        }
        key.verify(message, &self.signature)
    }

    pub fn verifies(&self, key: &PublicKey, message: &[u8]) -> bool {
        self.verify(key, message).is_ok()
    }
}

impl From<Signature> for SignatureSegment {
    fn from(signature: Signature) -> Self {
        Self {
            signature,
            canonical: true,
        }
    }
}

/// An Ed25519 keypair for signing claims.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a 32-byte seed. Deterministic.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// The secret seed. Handle with care.
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.seed())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let keypair = Keypair::generate();
        let message = b"hello, world";
        let signature = keypair.sign(message);

        assert!(keypair.public_key().verify(message, &signature).is_ok());
        assert!(!keypair.public_key().verifies(b"wrong message", &signature));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"m"), kp2.sign(b"m"));
    }

    #[test]
    fn other_key_rejects() {
        let a = Keypair::from_seed(&[1u8; 32]);
        let b = Keypair::from_seed(&[2u8; 32]);
        let signature = a.sign(b"payload");
        assert!(!b.public_key().verifies(b"payload", &signature));
    }

    #[test]
    fn base64url_is_unpadded() {
        let key = Keypair::from_seed(&[7u8; 32]).public_key();
        let encoded = key.to_base64url();
        assert_eq!(encoded.len(), 43);
        assert!(!encoded.contains('='));
        assert_eq!(PublicKey::from_base64url(&encoded).unwrap(), key);
    }

    #[test]
    fn short_signature_rejected() {
        let short = base64url_encode([0u8; 63]);
        assert!(Signature::from_base64url(&short).is_err());
    }

    #[test]
    fn trailing_bits_decode_but_never_verify() {
        let keypair = Keypair::from_seed(&[1u8; 32]);
        let encoded = keypair.sign(b"payload").to_base64url();
        let segment = SignatureSegment::parse(&encoded).unwrap();
        assert!(segment.is_canonical());
        assert!(segment.verifies(&keypair.public_key(), b"payload"));

        // Set the lowest of the four unused bits in the final character.
        let last = encoded.as_bytes()[85];
        let index = URL_ALPHABET
            .iter()
            .position(|&c| c == last)
            .unwrap();
        let bumped = URL_ALPHABET[index | 1] as char;
        let tampered = format!("{}{bumped}", &encoded[..85]);
        assert_ne!(tampered, encoded);

        let segment = SignatureSegment::parse(&tampered).unwrap();
        assert!(!segment.is_canonical());
        assert_eq!(
            segment.verify(&keypair.public_key(), b"payload"),
            Err(CoreError::InvalidSignature)
        );
        assert!(Signature::from_base64url(&tampered).is_err());
    }

    const URL_ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    #[test]
    fn wrong_length_public_key_rejected() {
        assert_eq!(
            PublicKey::from_slice(&[0u8; 31]),
            Err(CoreError::InvalidPublicKey)
        );
    }

    #[test]
    fn content_hash_format() {
        assert_eq!(
            hash_content(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
