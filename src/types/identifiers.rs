use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Short registry key naming a vocabulary (`schema`, `bioschemas`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VocabPrefix(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("Vocabulary prefix must not be empty")]
    Empty,
    #[error("Vocabulary prefix '{0}' must not contain whitespace or ':'")]
    InvalidCharacter(String),
    #[error("Vocabulary prefix '{0}' must not start with '@'")]
    Keyword(String),
}

impl VocabPrefix {
    pub fn new(raw: impl Into<String>) -> Result<Self, PrefixError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PrefixError::Empty);
        }
        if raw.starts_with('@') {
            return Err(PrefixError::Keyword(raw));
        }
        if raw.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(PrefixError::InvalidCharacter(raw));
        }
        Ok(VocabPrefix(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VocabPrefix {
    type Error = PrefixError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        VocabPrefix::new(value)
    }
}

impl From<VocabPrefix> for String {
    fn from(value: VocabPrefix) -> Self {
        value.0
    }
}

impl AsRef<str> for VocabPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VocabPrefix {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VocabPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for VocabPrefix {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for VocabPrefix {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The `@id` of an entity. Opaque to this crate; generated ids are `urn:uuid:` URNs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        EntityId(raw.into())
    }

    /// A fresh random URN. Two generated ids never collide in practice, so
    /// entities built from them never share a signature.
    pub fn generate() -> Self {
        EntityId(format!("urn:uuid:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content hash of a normalized document: lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);

        let hash = hasher.finalize();
        ContentDigest(hex::encode(hash))
    }

    /// Bare hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `sha256:<hex>` form, for places that mix hash algorithms.
    pub fn prefixed(&self) -> String {
        format!("sha256:{}", self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_validation() {
        assert!(VocabPrefix::new("schema").is_ok());
        assert!(VocabPrefix::new("schema-v13").is_ok());
        assert_eq!(VocabPrefix::new(""), Err(PrefixError::Empty));
        assert!(matches!(VocabPrefix::new("a b"), Err(PrefixError::InvalidCharacter(_))));
        assert!(matches!(VocabPrefix::new("ex:"), Err(PrefixError::InvalidCharacter(_))));
        assert!(matches!(VocabPrefix::new("@vocab"), Err(PrefixError::Keyword(_))));
    }

    #[test]
    fn test_prefix_deserialize_rejects_invalid() {
        let ok: Result<VocabPrefix, _> = serde_json::from_str("\"prov\"");
        assert!(ok.is_ok());
        let bad: Result<VocabPrefix, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_generated_ids_are_urns_and_distinct() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert!(a.as_str().starts_with("urn:uuid:"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = ContentDigest::from_content(b"");
        assert_eq!(
            digest.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(digest.prefixed().starts_with("sha256:e3b0"));
    }
}
