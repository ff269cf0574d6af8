// Registration happens once, at startup. Share the finished registry
// behind an `Arc`: no `&mut` access survives that point, so concurrent
// readers need no locking.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::registry::entry::VocabularyEntry;
use crate::types::identifiers::VocabPrefix;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown vocabulary: '{0}'")]
pub struct UnknownVocabularyError(pub String);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    UnknownVocabulary(#[from] UnknownVocabularyError),
    #[error("Invalid vocabulary entry '{prefix}': {reason}")]
    InvalidEntry { prefix: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of a vocabulary source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub vocabularies: Vec<VocabularyEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    entries: HashMap<VocabPrefix, VocabularyEntry>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in config.vocabularies {
            registry.register(entry)?;
        }
        Ok(registry)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Insert or replace an entry. Registering the same entry twice is a no-op.
    pub fn register(&mut self, entry: VocabularyEntry) -> Result<(), RegistryError> {
        validate_entry(&entry)?;
        debug!(prefix = %entry.prefix, namespace = %entry.namespace, "registering vocabulary");
        self.entries.insert(entry.prefix.clone(), entry);
        Ok(())
    }

    pub fn resolve(&self, prefix: &str) -> Result<&VocabularyEntry, UnknownVocabularyError> {
        self.entries
            .get(prefix)
            .ok_or_else(|| UnknownVocabularyError(prefix.to_string()))
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.resolve(prefix).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&VocabPrefix> {
        let mut prefixes: Vec<&VocabPrefix> = self.entries.keys().collect();
        prefixes.sort();
        prefixes
    }

    /// Entries carrying `tag`, sorted by prefix.
    pub fn tagged(&self, tag: &str) -> Vec<&VocabularyEntry> {
        let mut entries: Vec<&VocabularyEntry> =
            self.entries.values().filter(|e| e.has_tag(tag)).collect();
        entries.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        entries
    }

    /// Domain classification: tag -> prefixes carrying it.
    pub fn domains(&self) -> BTreeMap<String, Vec<VocabPrefix>> {
        let mut domains: BTreeMap<String, Vec<VocabPrefix>> = BTreeMap::new();
        for entry in self.entries.values() {
            for tag in &entry.tags {
                domains.entry(tag.clone()).or_default().push(entry.prefix.clone());
            }
        }
        for prefixes in domains.values_mut() {
            prefixes.sort();
        }
        domains
    }
}

fn validate_entry(entry: &VocabularyEntry) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidEntry {
        prefix: entry.prefix.to_string(),
        reason,
    };

    Url::parse(&entry.namespace).map_err(|e| {
        invalid(format!(
            "namespace '{}' is not an absolute URI: {e}",
            entry.namespace
        ))
    })?;

    if entry.version.current.trim().is_empty() {
        return Err(invalid("version.current must not be empty".into()));
    }

    for (hosted, property) in &entry.features.scopes {
        if property.is_empty() {
            return Err(invalid(format!("empty scope property for '{hosted}'")));
        }
    }
    for (host, property) in &entry.features.scoped_under {
        if property.is_empty() {
            return Err(invalid(format!("empty scope property under '{host}'")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(prefix: &str) -> VocabularyEntry {
        let context = json!({"name": "http://schema.org/name"});
        VocabularyEntry::new(
            VocabPrefix::new(prefix).unwrap(),
            "http://schema.org/",
            context.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn test_register_is_idempotent_upsert() {
        let mut registry = VocabularyRegistry::new();
        registry.register(entry("schema")).unwrap();
        registry.register(entry("schema")).unwrap();
        assert_eq!(registry.len(), 1);

        let updated = entry("schema").with_tags(["general"]);
        registry.register(updated).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("schema").unwrap().has_tag("general"));
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = VocabularyRegistry::new();
        assert_eq!(
            registry.resolve("missing").unwrap_err(),
            UnknownVocabularyError("missing".into())
        );
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn test_rejects_relative_namespace() {
        let mut registry = VocabularyRegistry::new();
        let mut bad = entry("schema");
        bad.namespace = "schema.org/".into();
        let err = registry.register(bad).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidEntry { ref prefix, .. } if prefix == "schema"
        ));
    }

    #[test]
    fn test_domains_group_by_tag() {
        let mut registry = VocabularyRegistry::new();
        registry.register(entry("b").with_tags(["bio"])).unwrap();
        registry.register(entry("a").with_tags(["bio", "general"])).unwrap();

        let domains = registry.domains();
        assert_eq!(
            domains["bio"],
            vec![VocabPrefix::new("a").unwrap(), VocabPrefix::new("b").unwrap()]
        );
        assert_eq!(domains["general"].len(), 1);
        assert_eq!(registry.tagged("bio").len(), 2);
    }
}
