//! Claim identifiers.
//!
//! Production ids are `hap_` followed by 12 characters from a 62-symbol
//! alphanumeric alphabet. Test ids live in a separate `hap_test_` namespace
//! with an 8-character suffix, and verifiers reject them unless explicitly
//! configured otherwise.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rand::{CryptoRng, RngCore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// Prefix shared by every production claim id.
pub const ID_PREFIX: &str = "hap_";

/// Prefix of the test id namespace.
pub const TEST_ID_PREFIX: &str = "hap_test_";

/// Symbols used for the random suffix.
pub const ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const ID_SUFFIX_LEN: usize = 12;
const TEST_ID_SUFFIX_LEN: usize = 8;

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hap_[A-Za-z0-9]{12}$").expect("claim id pattern is a valid regex")
});

static TEST_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hap_test_[A-Za-z0-9]{8}$").expect("test id pattern is a valid regex")
});

/// A validated claim identifier, production or test.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClaimId(String);

impl ClaimId {
    /// Generate a fresh production id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a production id from the given RNG.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(format!("{ID_PREFIX}{}", random_suffix(rng, ID_SUFFIX_LEN)))
    }

    /// Generate a fresh id in the test namespace.
    pub fn generate_test() -> Self {
        Self::generate_test_with(&mut rand::thread_rng())
    }

    /// Generate a test-namespace id from the given RNG.
    pub fn generate_test_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(format!(
            "{TEST_ID_PREFIX}{}",
            random_suffix(rng, TEST_ID_SUFFIX_LEN)
        ))
    }

    /// Parse an id in either namespace.
    pub fn parse(s: &str) -> Result<Self> {
        if is_valid_id(s) || is_test_id(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(CoreError::MalformedId(s.to_owned()))
        }
    }

    /// Parse an id, accepting only the production namespace.
    pub fn parse_production(s: &str) -> Result<Self> {
        if is_valid_id(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(CoreError::MalformedId(s.to_owned()))
        }
    }

    /// True if this id is in the test namespace.
    pub fn is_test(&self) -> bool {
        self.0.starts_with(TEST_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn random_suffix<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ID_ALPHABET[usize::from(*b) % ID_ALPHABET.len()] as char)
        .collect()
}

/// True if `s` is a well-formed production id.
pub fn is_valid_id(s: &str) -> bool {
    ID_PATTERN.is_match(s)
}

/// True if `s` is a well-formed test-namespace id.
pub fn is_test_id(s: &str) -> bool {
    TEST_ID_PATTERN.is_match(s)
}

/// Pull a production claim id out of the last path segment of a URL,
/// e.g. `https://ballista.jobs/v/hap_abc123xyz456`.
pub fn extract_id_from_url(url: &str) -> Option<ClaimId> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    ClaimId::parse_production(last).ok()
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimId({})", self.0)
    }
}

impl FromStr for ClaimId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClaimId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        if is_valid_id(&s) || is_test_id(&s) {
            Ok(Self(s))
        } else {
            Err(CoreError::MalformedId(s))
        }
    }
}

impl From<ClaimId> for String {
    fn from(id: ClaimId) -> Self {
        id.0
    }
}

impl AsRef<str> for ClaimId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
