use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheStats, MemoCache};
use crate::canonical::json::to_sorted_json;
use crate::canonical::{to_rdf, urdna2015, CanonicalizationError};

pub const DEFAULT_MAX_WORK: usize = 4096;

/// Identity of the backend that produced a normalized string.
///
/// Travels with every signature: the same logical input can serialize
/// differently under another backend or version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendId {
    pub name: String,
    pub version: String,
    /// True when equal output means RDF-equivalent input.
    pub canonical: bool,
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

pub trait CanonicalizationBackend: Send + Sync {
    fn id(&self) -> BackendId;

    fn canonicalize(&self, document: &Value) -> Result<String, CanonicalizationError>;
}

/// JSON-LD expansion to quads, URDNA2015 relabeling, sorted N-Quads.
#[derive(Debug, Clone)]
pub struct Urdna2015Backend {
    max_work: usize,
}

impl Urdna2015Backend {
    pub fn new(max_work: usize) -> Self {
        Self { max_work }
    }
}

impl Default for Urdna2015Backend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORK)
    }
}

impl CanonicalizationBackend for Urdna2015Backend {
    fn id(&self) -> BackendId {
        BackendId {
            name: "urdna2015".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            canonical: true,
        }
    }

    fn canonicalize(&self, document: &Value) -> Result<String, CanonicalizationError> {
        let quads = to_rdf::to_rdf(document)?;
        urdna2015::canonicalize(&quads, self.max_work)
    }
}

/// Sorted-key JSON. Deterministic, but not RDF-aware.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedJsonBackend;

impl CanonicalizationBackend for SortedJsonBackend {
    fn id(&self) -> BackendId {
        BackendId {
            name: "sorted-json".into(),
            version: "1".into(),
            canonical: false,
        }
    }

    fn canonicalize(&self, document: &Value) -> Result<String, CanonicalizationError> {
        Ok(to_sorted_json(document))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Urdna2015,
    SortedJson,
}

impl BackendKind {
    pub fn build(self) -> Box<dyn CanonicalizationBackend> {
        match self {
            BackendKind::Urdna2015 => Box::new(Urdna2015Backend::default()),
            BackendKind::SortedJson => Box::new(SortedJsonBackend),
        }
    }
}

/// A normalized document and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub text: String,
    pub backend: BackendId,
    /// Why the output is not canonical, if it is not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Normalized {
    pub fn is_canonical(&self) -> bool {
        self.degraded.is_none()
    }
}

pub struct CanonicalizationEngine {
    backend: Box<dyn CanonicalizationBackend>,
    fallback: SortedJsonBackend,
    cache: MemoCache<String, Arc<Normalized>>,
}

impl CanonicalizationEngine {
    pub fn new(backend: Box<dyn CanonicalizationBackend>, cache: &CacheConfig) -> Self {
        Self {
            backend,
            fallback: SortedJsonBackend,
            cache: MemoCache::new(cache),
        }
    }

    pub fn from_kind(kind: BackendKind, cache: &CacheConfig) -> Self {
        Self::new(kind.build(), cache)
    }

    pub fn backend_id(&self) -> BackendId {
        self.backend.id()
    }

    /// Never fails: backend errors fall back to sorted JSON, marked degraded.
    pub fn normalize(&self, document: &Value) -> Arc<Normalized> {
        let key = cache_key(document);
        self.cache
            .get_or_insert_with(key, || Arc::new(self.normalize_uncached(document)))
    }

    /// The configured backend only, errors surfaced.
    pub fn try_normalize(&self, document: &Value) -> Result<String, CanonicalizationError> {
        self.backend.canonicalize(document)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn normalize_uncached(&self, document: &Value) -> Normalized {
        let backend = self.backend.id();
        match self.backend.canonicalize(document) {
            Ok(text) => {
                debug!(backend = %backend, bytes = text.len(), "normalized document");
                let degraded = (!backend.canonical)
                    .then(|| format!("backend '{}' is not RDF-canonical", backend.name));
                Normalized {
                    text,
                    backend,
                    degraded,
                }
            }
            Err(err) => {
                warn!(
                    backend = %backend,
                    error = %err,
                    "canonicalization failed, using sorted JSON"
                );
                Normalized {
                    text: to_sorted_json(document),
                    backend: self.fallback.id(),
                    degraded: Some(err.to_string()),
                }
            }
        }
    }
}

impl fmt::Debug for CanonicalizationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalizationEngine")
            .field("backend", &self.backend.id())
            .field("cache", &self.cache)
            .finish()
    }
}

fn cache_key(document: &Value) -> String {
    hex::encode(Sha256::digest(to_sorted_json(document).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> CanonicalizationEngine {
        CanonicalizationEngine::from_kind(BackendKind::Urdna2015, &CacheConfig::new(16, None))
    }

    #[test]
    fn test_canonical_output_is_not_degraded() {
        let normalized = engine().normalize(&json!({
            "@context": {"name": "http://schema.org/name"},
            "@id": "http://ex/a",
            "name": "A"
        }));
        assert!(normalized.is_canonical());
        assert_eq!(normalized.text, "<http://ex/a> <http://schema.org/name> \"A\" .\n");
        assert_eq!(normalized.backend.name, "urdna2015");
    }

    #[test]
    fn test_backend_failure_degrades_to_sorted_json() {
        let document = json!({"@context": "https://schema.org/", "name": "A"});
        let engine = engine();
        let normalized = engine.normalize(&document);
        assert!(!normalized.is_canonical());
        assert_eq!(normalized.backend.name, "sorted-json");
        assert_eq!(normalized.text, r#"{"@context":"https://schema.org/","name":"A"}"#);
        assert!(engine.try_normalize(&document).is_err());
    }

    #[test]
    fn test_sorted_json_backend_is_always_degraded() {
        let engine =
            CanonicalizationEngine::from_kind(BackendKind::SortedJson, &CacheConfig::disabled());
        let normalized = engine.normalize(&json!({"b": 1, "a": 2}));
        assert_eq!(normalized.text, r#"{"a":2,"b":1}"#);
        assert!(normalized.degraded.is_some());
    }

    #[test]
    fn test_cache_key_ignores_key_order() {
        let engine = engine();
        let first = engine.normalize(&json!({
            "@id": "http://ex/a",
            "@context": {"@vocab": "http://ex/"},
            "x": 1
        }));
        let second = engine.normalize(&json!({
            "x": 1,
            "@context": {"@vocab": "http://ex/"},
            "@id": "http://ex/a"
        }));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_stats().hits, 1);
    }
}
