//! Vocabularies shipped with the crate.
//!
//! Hosts with their own vocabulary source build a registry from
//! [`RegistryConfig`](super::RegistryConfig) instead.

use serde_json::{json, Value};

use crate::registry::entry::{CollisionFeatures, VersionInfo, VocabularyEntry};
use crate::registry::registry::{RegistryError, VocabularyRegistry};
use crate::types::identifiers::VocabPrefix;

pub const SCHEMA_NS: &str = "http://schema.org/";
pub const BIOSCHEMAS_NS: &str = "https://bioschemas.org/";
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const FOAF_NS: &str = "http://xmlns.com/foaf/0.1/";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";

const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Registry holding every built-in vocabulary.
pub fn builtin_registry() -> Result<VocabularyRegistry, RegistryError> {
    let mut registry = VocabularyRegistry::new();
    for entry in builtin_entries()? {
        registry.register(entry)?;
    }
    Ok(registry)
}

pub fn builtin_entries() -> Result<Vec<VocabularyEntry>, RegistryError> {
    Ok(vec![
        make(
            "schema",
            SCHEMA_NS,
            json!({
                "schema": SCHEMA_NS,
                "name": "http://schema.org/name",
                "description": "http://schema.org/description",
                "url": {"@id": "http://schema.org/url", "@type": "@id"},
                "identifier": "http://schema.org/identifier",
                "dateCreated": {"@id": "http://schema.org/dateCreated", "@type": XSD_DATE_TIME},
                "author": {"@id": "http://schema.org/author", "@type": "@id"},
                "Person": "http://schema.org/Person",
                "Dataset": "http://schema.org/Dataset",
                "Thing": "http://schema.org/Thing"
            }),
        )?
        .with_version(VersionInfo {
            current: "26.0".into(),
            history: vec!["13.0".into(), "15.0".into()],
            coexisting: false,
        })
        .with_features(CollisionFeatures {
            scopes: [("prov".to_string(), "data".to_string())].into_iter().collect(),
            ..CollisionFeatures::default()
        })
        .with_tags(["general", "web"]),
        make(
            "bioschemas",
            BIOSCHEMAS_NS,
            json!({
                "name": "http://schema.org/name",
                "Protein": "https://bioschemas.org/Protein",
                "Gene": "https://bioschemas.org/Gene",
                "Taxon": "https://bioschemas.org/Taxon",
                "encodedBy": {"@id": "https://bioschemas.org/encodedBy", "@type": "@id"},
                "taxonomicRange": {"@id": "https://bioschemas.org/taxonomicRange", "@type": "@id"}
            }),
        )?
        .with_version(VersionInfo::new("1.0"))
        .with_tags(["life-sciences", "biology"]),
        make(
            "prov",
            PROV_NS,
            json!({
                "prov": PROV_NS,
                "wasGeneratedBy": {"@id": "prov:wasGeneratedBy", "@type": "@id"},
                "wasDerivedFrom": {"@id": "prov:wasDerivedFrom", "@type": "@id"},
                "wasAttributedTo": {"@id": "prov:wasAttributedTo", "@type": "@id"},
                "generatedAtTime": {"@id": "prov:generatedAtTime", "@type": XSD_DATE_TIME},
                "Activity": "prov:Activity",
                "Entity": "prov:Entity"
            }),
        )?
        .with_version(VersionInfo::new("2013-04-30"))
        .with_tags(["provenance"]),
        make(
            "dcterms",
            DCTERMS_NS,
            json!({
                "dcterms": DCTERMS_NS,
                "title": "dcterms:title",
                "creator": "dcterms:creator",
                "created": {"@id": "dcterms:created", "@type": XSD_DATE},
                "license": {"@id": "dcterms:license", "@type": "@id"}
            }),
        )?
        .with_version(VersionInfo::new("2020-01-20"))
        .with_tags(["metadata", "publishing"]),
        make(
            "foaf",
            FOAF_NS,
            json!({
                "foaf": FOAF_NS,
                "name": "foaf:name",
                "knows": {"@id": "foaf:knows", "@type": "@id"},
                "mbox": {"@id": "foaf:mbox", "@type": "@id"},
                "Person": "foaf:Person"
            }),
        )?
        .with_version(VersionInfo::new("0.99"))
        .with_features(CollisionFeatures {
            named_graph: Some("urn:graph:social".into()),
            ..CollisionFeatures::default()
        })
        .with_tags(["social"]),
        make(
            "skos",
            SKOS_NS,
            json!({
                "skos": SKOS_NS,
                "prefLabel": {"@id": "skos:prefLabel", "@container": "@language"},
                "altLabel": {"@id": "skos:altLabel", "@container": "@language"},
                "broader": {"@id": "skos:broader", "@type": "@id"},
                "Concept": "skos:Concept"
            }),
        )?
        .with_version(VersionInfo::new("2009-08-18"))
        .with_features(CollisionFeatures {
            nested_in: ["schema".to_string()].into_iter().collect(),
            ..CollisionFeatures::default()
        })
        .with_tags(["taxonomy", "metadata"]),
    ])
}

fn make(prefix: &str, namespace: &str, context: Value) -> Result<VocabularyEntry, RegistryError> {
    let prefix = VocabPrefix::new(prefix).map_err(|e| RegistryError::InvalidEntry {
        prefix: prefix.to_string(),
        reason: e.to_string(),
    })?;
    let context = match context {
        Value::Object(map) => map,
        _ => {
            return Err(RegistryError::InvalidEntry {
                prefix: prefix.to_string(),
                reason: "context must be a JSON object".into(),
            })
        }
    };
    Ok(VocabularyEntry::new(prefix, namespace, context))
}
