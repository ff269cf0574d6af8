use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::canonical::{BackendId, Normalized};
use crate::compose::{ComposeError, ComposeOptions};
use crate::session::Session;
use crate::types::identifiers::{ContentDigest, EntityId, VocabPrefix};

const RESERVED_KEYS: &[&str] = &["@id", "@context"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("An entity needs at least one vocabulary")]
    EmptyVocabulary,

    #[error("Vocabulary '{0}' is listed more than once")]
    DuplicateVocabulary(String),

    #[error("Unknown vocabulary: '{0}'")]
    UnknownVocabulary(String),

    #[error("Entity content must be a JSON object, got {0}")]
    InvalidContent(String),

    #[error("Content key '{0}' is reserved")]
    ReservedKey(String),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Content address of an entity and the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub sha256: ContentDigest,
    pub backend: BackendId,
    /// False when the digest covers degraded, non RDF-canonical output.
    pub canonical: bool,
}

/// What a store persists next to an entity to re-verify it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: EntityId,
    pub vocab: Vec<VocabPrefix>,
    pub sha256: ContentDigest,
    pub backend: BackendId,
    pub canonical: bool,
    pub created_at: DateTime<Utc>,
}

/// Immutable, content-addressed record: a vocabulary list plus a content
/// object, signed by the SHA-256 of its normalized JSON-LD form.
///
/// Derived values are computed on first access and kept for the entity's
/// lifetime. There is no mutation: [`Entity::revise`] builds a new entity.
pub struct Entity {
    id: EntityId,
    vocab: Vec<VocabPrefix>,
    content: Map<String, Value>,
    created_at: DateTime<Utc>,
    session: Session,
    as_json: OnceLock<Result<Value, EntityError>>,
    normalized: OnceLock<Arc<Normalized>>,
    signature: OnceLock<Signature>,
}

impl Entity {
    /// Takes ownership of `content`; nothing outside the entity can alias it.
    pub fn new<S>(
        session: &Session,
        id: Option<EntityId>,
        vocab: &[S],
        content: Value,
    ) -> Result<Self, EntityError>
    where
        S: AsRef<str>,
    {
        let vocab = validate_vocab(session, vocab)?;
        let content = validate_content(content)?;
        let id = id.unwrap_or_else(EntityId::generate);

        debug!(id = %id, vocab = vocab.len(), "constructed entity");
        Ok(Self {
            id,
            vocab,
            content,
            created_at: Utc::now(),
            session: session.clone(),
            as_json: OnceLock::new(),
            normalized: OnceLock::new(),
            signature: OnceLock::new(),
        })
    }

    /// Same id and vocabularies over new content.
    pub fn revise(&self, content: Value) -> Result<Self, EntityError> {
        Entity::new(&self.session, Some(self.id.clone()), self.vocab.as_slice(), content)
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn vocab(&self) -> &[VocabPrefix] {
        &self.vocab
    }

    pub fn primary(&self) -> &VocabPrefix {
        &self.vocab[0]
    }

    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// `{"@context": ..., "@id": ..., ...content}`.
    pub fn as_json(&self) -> Result<&Value, EntityError> {
        self.as_json
            .get_or_init(|| self.build_json())
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn normalized(&self) -> Result<&Normalized, EntityError> {
        let document = self.as_json()?;
        let normalized = self
            .normalized
            .get_or_init(|| self.session.normalize(document));
        Ok(&**normalized)
    }

    pub fn signature(&self) -> Result<&Signature, EntityError> {
        let normalized = self.normalized()?;
        Ok(self.signature.get_or_init(|| Signature {
            sha256: ContentDigest::from_content(normalized.text.as_bytes()),
            backend: normalized.backend.clone(),
            canonical: normalized.is_canonical(),
        }))
    }

    /// Lowercase hex SHA-256 of [`normalized`](Self::normalized).
    pub fn sha256(&self) -> Result<&str, EntityError> {
        Ok(self.signature()?.sha256.as_str())
    }

    pub fn record(&self) -> Result<SignatureRecord, EntityError> {
        let signature = self.signature()?;
        Ok(SignatureRecord {
            id: self.id.clone(),
            vocab: self.vocab.clone(),
            sha256: signature.sha256.clone(),
            backend: signature.backend.clone(),
            canonical: signature.canonical,
            created_at: self.created_at,
        })
    }

    fn build_json(&self) -> Result<Value, EntityError> {
        let composed = self.session.compose(self.vocab.as_slice(), ComposeOptions::default())?;

        let mut document = Map::new();
        document.insert("@context".into(), composed.context().clone());
        document.insert("@id".into(), Value::String(self.id.as_str().to_string()));
        document.extend(self.content.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Value::Object(document))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("vocab", &self.vocab)
            .field("created_at", &self.created_at)
            .field("signed", &self.signature.get().is_some())
            .finish()
    }
}

fn validate_vocab<S>(session: &Session, vocab: &[S]) -> Result<Vec<VocabPrefix>, EntityError>
where
    S: AsRef<str>,
{
    if vocab.is_empty() {
        return Err(EntityError::EmptyVocabulary);
    }

    let registry = session.registry();
    let mut seen = HashSet::new();
    let mut prefixes = Vec::with_capacity(vocab.len());
    for raw in vocab {
        let raw = raw.as_ref();
        if !seen.insert(raw) {
            return Err(EntityError::DuplicateVocabulary(raw.to_string()));
        }
        let entry = registry
            .resolve(raw)
            .map_err(|err| EntityError::UnknownVocabulary(err.0))?;
        prefixes.push(entry.prefix.clone());
    }
    Ok(prefixes)
}

fn validate_content(content: Value) -> Result<Map<String, Value>, EntityError> {
    let map = match content {
        Value::Object(map) => map,
        Value::Null => return Err(EntityError::InvalidContent("null".into())),
        Value::Bool(_) => return Err(EntityError::InvalidContent("a boolean".into())),
        Value::Number(_) => return Err(EntityError::InvalidContent("a number".into())),
        Value::String(_) => return Err(EntityError::InvalidContent("a string".into())),
        Value::Array(_) => return Err(EntityError::InvalidContent("an array".into())),
    };
    if let Some(key) = RESERVED_KEYS.iter().find(|key| map.contains_key(**key)) {
        return Err(EntityError::ReservedKey(key.to_string()));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use serde_json::json;

    fn session() -> Session {
        Session::builtin(&SessionConfig::v0()).unwrap()
    }

    #[test]
    fn test_rejects_bad_vocab_lists() {
        let session = session();
        let empty: [&str; 0] = [];
        assert_eq!(
            session.entity(&empty, json!({})).unwrap_err(),
            EntityError::EmptyVocabulary
        );
        assert_eq!(
            session.entity(&["schema", "schema"], json!({})).unwrap_err(),
            EntityError::DuplicateVocabulary("schema".into())
        );
        assert_eq!(
            session.entity(&["missing"], json!({})).unwrap_err(),
            EntityError::UnknownVocabulary("missing".into())
        );
    }

    #[test]
    fn test_rejects_non_object_and_reserved_keys() {
        let session = session();
        assert_eq!(
            session.entity(&["schema"], json!([1])).unwrap_err(),
            EntityError::InvalidContent("an array".into())
        );
        assert_eq!(
            session.entity(&["schema"], json!({"@id": "urn:x"})).unwrap_err(),
            EntityError::ReservedKey("@id".into())
        );
    }

    #[test]
    fn test_generated_ids_are_urns() {
        let entity = session().entity(&["schema"], json!({"name": "x"})).unwrap();
        assert!(entity.id().as_str().starts_with("urn:uuid:"));
    }

    #[test]
    fn test_as_json_shape() {
        let entity = session()
            .entity_with_id(EntityId::new("urn:test:1"), &["schema"], json!({"name": "x"}))
            .unwrap();
        let document = entity.as_json().unwrap();
        assert_eq!(document["@id"], json!("urn:test:1"));
        assert_eq!(document["name"], json!("x"));
        assert!(document["@context"].is_object());
    }

    #[test]
    fn test_derived_values_are_memoized() {
        let entity = session().entity(&["schema"], json!({"name": "x"})).unwrap();
        let first = entity.sha256().unwrap() as *const str;
        let second = entity.sha256().unwrap() as *const str;
        assert_eq!(first, second);
        assert_eq!(entity.sha256().unwrap().len(), 64);
    }

    #[test]
    fn test_revise_keeps_identity() {
        let original = session()
            .entity_with_id(EntityId::new("urn:test:2"), &["schema"], json!({"name": "a"}))
            .unwrap();
        let revised = original.revise(json!({"name": "b"})).unwrap();
        assert_eq!(revised.id(), original.id());
        assert_ne!(revised.sha256().unwrap(), original.sha256().unwrap());
    }
}
