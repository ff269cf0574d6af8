use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::identifiers::VocabPrefix;

/// A named schema bundle: a JSON-LD term mapping plus the metadata the
/// collision resolver and domain classification read.
///
/// Entries are immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub prefix: VocabPrefix,
    /// Primary namespace URI.
    pub namespace: String,
    /// Term -> IRI mapping. Values may be plain IRIs or expanded term definitions.
    pub context: Map<String, Value>,
    pub version: VersionInfo,
    #[serde(default)]
    pub features: CollisionFeatures,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VocabularyEntry {
    pub fn new(
        prefix: VocabPrefix,
        namespace: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            prefix,
            namespace: namespace.into(),
            context,
            version: VersionInfo::default(),
            features: CollisionFeatures::default(),
            tags: BTreeSet::new(),
            description: None,
        }
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn with_features(mut self, features: CollisionFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// The context payload as a JSON value, ready to be placed in a `@context`.
    pub fn context_value(&self) -> Value {
        Value::Object(self.context.clone())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub current: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
    /// Several versions of this vocabulary are in use side by side, so
    /// composition must rely on positional last-definition-wins.
    #[serde(default)]
    pub coexisting: bool,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            current: "1.0".into(),
            history: Vec::new(),
            coexisting: false,
        }
    }
}

impl VersionInfo {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            ..Self::default()
        }
    }
}

/// Declared relationships to other vocabularies, keyed by their prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFeatures {
    /// Vocabularies this one hosts under a property: `prefix -> property`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scopes: BTreeMap<String, String>,
    /// Hosts this vocabulary lives under: `host prefix -> property`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scoped_under: BTreeMap<String, String>,
    /// Hosts whose nested sub-objects this vocabulary overrides.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub nested_in: BTreeSet<String>,
    /// Named graph this vocabulary's data is stored in, if not the default graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_graph: Option<String>,
}

impl CollisionFeatures {
    pub fn is_empty(&self) -> bool {
        self == &CollisionFeatures::default()
    }
}
