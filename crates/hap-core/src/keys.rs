//! Issuer key records and key sets.
//!
//! Keys are published as JWK-style records `{kid, kty, crv, x}` with
//! `kty = "OKP"`, `crv = "Ed25519"` and `x` the unpadded base64url public
//! key. An issuer's key set is published as `{issuer, keys}`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};

pub const KEY_TYPE: &str = "OKP";
pub const CURVE: &str = "Ed25519";

/// A published public key, identified by `kid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    kid: String,
    public_key: PublicKey,
}

#[derive(Serialize, Deserialize)]
struct JwkWire {
    kid: String,
    kty: String,
    crv: String,
    x: String,
}

impl KeyRecord {
    pub fn new(kid: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            kid: kid.into(),
            public_key,
        }
    }

    /// Import a JWK, checking key type, curve and key bytes.
    pub fn from_jwk(kid: &str, kty: &str, crv: &str, x: &str) -> Result<Self> {
        if kid.is_empty() {
            return Err(CoreError::InvalidClaim("key record has an empty kid".into()));
        }
        if kty != KEY_TYPE || crv != CURVE {
            return Err(CoreError::InvalidPublicKey);
        }
        Ok(Self::new(kid, PublicKey::from_base64url(x)?))
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl Serialize for KeyRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        JwkWire {
            kid: self.kid.clone(),
            kty: KEY_TYPE.to_owned(),
            crv: CURVE.to_owned(),
            x: self.public_key.to_base64url(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = JwkWire::deserialize(deserializer)?;
        KeyRecord::from_jwk(&wire.kid, &wire.kty, &wire.crv, &wire.x)
            .map_err(serde::de::Error::custom)
    }
}

/// Export a public key as a key record.
pub fn export_public_key(public_key: &PublicKey, kid: impl Into<String>) -> KeyRecord {
    KeyRecord::new(kid, *public_key)
}

/// The set of keys an issuer publishes.
///
/// Iteration follows publication order. When two records share a `kid`,
/// lookups return the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WellKnownKeySet {
    issuer: String,
    keys: Vec<KeyRecord>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct KeySetWire {
    issuer: String,
    keys: Vec<KeyRecord>,
}

impl WellKnownKeySet {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            keys: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_keys(issuer: impl Into<String>, keys: impl IntoIterator<Item = KeyRecord>) -> Self {
        let mut set = Self::new(issuer);
        for key in keys {
            set.push(key);
        }
        set
    }

    /// Append a key. Rotation adds new keys alongside the old ones.
    pub fn push(&mut self, key: KeyRecord) {
        self.index
            .entry(key.kid.clone())
            .or_insert(self.keys.len());
        self.keys.push(key);
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn get(&self, kid: &str) -> Option<&KeyRecord> {
        self.index.get(kid).map(|&i| &self.keys[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a published `{issuer, keys}` document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Encoding(format!("key set: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Encoding(e.to_string()))
    }
}

impl Serialize for WellKnownKeySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        KeySetWire {
            issuer: self.issuer.clone(),
            keys: self.keys.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WellKnownKeySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = KeySetWire::deserialize(deserializer)?;
        Ok(Self::with_keys(wire.issuer, wire.keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn jwk_shape() {
        let key = Keypair::from_seed(&[1u8; 32]).public_key();
        let record = export_public_key(&key, "key_001");
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kid"], "key_001");
        assert_eq!(json["kty"], "OKP");
        assert_eq!(json["crv"], "Ed25519");
        assert_eq!(json["x"], key.to_base64url());
    }

    #[test]
    fn import_rejects_wrong_curve() {
        let x = Keypair::from_seed(&[1u8; 32]).public_key().to_base64url();
        assert_eq!(
            KeyRecord::from_jwk("k", "OKP", "X25519", &x),
            Err(CoreError::InvalidPublicKey)
        );
        assert_eq!(
            KeyRecord::from_jwk("k", "EC", "Ed25519", &x),
            Err(CoreError::InvalidPublicKey)
        );
        assert!(KeyRecord::from_jwk("k", "OKP", "Ed25519", "not-a-key").is_err());
        assert!(KeyRecord::from_jwk("k", "OKP", "Ed25519", &x).is_ok());
    }

    #[test]
    fn first_duplicate_kid_wins() {
        let a = Keypair::from_seed(&[1u8; 32]).public_key();
        let b = Keypair::from_seed(&[2u8; 32]).public_key();
        let set = WellKnownKeySet::with_keys(
            "ballista.jobs",
            [KeyRecord::new("k", a), KeyRecord::new("k", b)],
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("k").unwrap().public_key(), &a);
    }

    #[test]
    fn document_round_trip_keeps_order() {
        let set = WellKnownKeySet::with_keys(
            "ballista.jobs",
            [
                KeyRecord::new("key_002", Keypair::from_seed(&[2u8; 32]).public_key()),
                KeyRecord::new("key_001", Keypair::from_seed(&[1u8; 32]).public_key()),
            ],
        );
        let parsed = WellKnownKeySet::from_json(set.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, set);
        let kids: Vec<_> = parsed.iter().map(KeyRecord::kid).collect();
        assert_eq!(kids, ["key_002", "key_001"]);
    }
}
