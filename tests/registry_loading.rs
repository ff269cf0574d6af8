use std::fs;

use serde_json::json;
use tempfile::tempdir;
use vocab_context_core::registry::{RegistryError, VocabularyRegistry};
use vocab_context_core::{Session, SessionConfig};

const REGISTRY_JSON: &str = r#"{
    "vocabularies": [
        {
            "prefix": "lab",
            "namespace": "https://lab.example/terms/",
            "context": {
                "sample": "https://lab.example/terms/sample",
                "Assay": "https://lab.example/terms/Assay"
            },
            "version": {"current": "3.1", "history": ["3.0"]},
            "features": {"scopes": {"audit": "audit"}},
            "tags": ["life-sciences"]
        },
        {
            "prefix": "audit",
            "namespace": "https://audit.example/",
            "context": {"checkedBy": {"@id": "https://audit.example/checkedBy", "@type": "@id"}},
            "version": {"current": "1.0"},
            "tags": ["provenance"]
        }
    ]
}"#;

#[test]
fn load_registry_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vocabularies.json");
    fs::write(&path, REGISTRY_JSON).unwrap();

    let registry = VocabularyRegistry::load(&path).unwrap();
    assert_eq!(registry.len(), 2);

    let lab = registry.resolve("lab").unwrap();
    assert_eq!(lab.version.current, "3.1");
    assert_eq!(lab.version.history, vec!["3.0".to_string()]);
    assert!(lab.has_tag("life-sciences"));

    let domains = registry.domains();
    assert_eq!(domains["provenance"].len(), 1);
    assert_eq!(domains["provenance"][0], "audit");
}

#[test]
fn loaded_registry_drives_composition() {
    let registry = VocabularyRegistry::from_json_str(REGISTRY_JSON).unwrap();
    let session = Session::new(registry, &SessionConfig::v0());

    let composed = session
        .compose(&["lab", "audit"], Default::default())
        .unwrap();
    assert_eq!(
        composed.context()["audit"],
        json!({"checkedBy": {"@id": "https://audit.example/checkedBy", "@type": "@id"}})
    );

    let entity = session
        .entity_with_id(
            vocab_context_core::EntityId::new("https://lab.example/run/7"),
            &["lab", "audit"],
            json!({"sample": "S-7", "audit": {"checkedBy": "https://lab.example/staff/ada"}}),
        )
        .unwrap();
    let text = &entity.normalized().unwrap().text;
    assert!(text.contains(
        "<https://lab.example/run/7> <https://audit.example/checkedBy> \
         <https://lab.example/staff/ada> .\n"
    ));
}

#[test]
fn register_is_an_idempotent_upsert() {
    let mut registry = VocabularyRegistry::from_json_str(REGISTRY_JSON).unwrap();
    let lab = registry.resolve("lab").unwrap().clone();

    registry.register(lab.clone()).unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.resolve("lab").unwrap(), &lab);
}

#[test]
fn load_errors_are_typed() {
    let dir = tempdir().unwrap();

    let missing = VocabularyRegistry::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, RegistryError::Io(_)));

    let malformed_path = dir.path().join("malformed.json");
    fs::write(&malformed_path, "{ not json").unwrap();
    let malformed = VocabularyRegistry::load(&malformed_path).unwrap_err();
    assert!(matches!(malformed, RegistryError::Json(_)));

    let bad_namespace = r#"{"vocabularies": [
        {"prefix": "x", "namespace": "not a uri", "context": {}, "version": {"current": "1"}}
    ]}"#;
    match VocabularyRegistry::from_json_str(bad_namespace).unwrap_err() {
        RegistryError::InvalidEntry { prefix, .. } => assert_eq!(prefix, "x"),
        other => panic!("expected InvalidEntry, got {other:?}"),
    }

    let bad_prefix = r#"{"vocabularies": [
        {"prefix": "@x", "namespace": "https://x.example/", "context": {},
         "version": {"current": "1"}}
    ]}"#;
    assert!(matches!(
        VocabularyRegistry::from_json_str(bad_prefix).unwrap_err(),
        RegistryError::Json(_)
    ));
}
