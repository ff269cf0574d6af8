use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::Value;
use vocab_context_core::canonical::BackendId;
use vocab_context_core::compose::ComposeOptions;
use vocab_context_core::entity::SignatureRecord;
use vocab_context_core::types::{ContentDigest, EntityId, VocabPrefix};
use vocab_context_core::{Session, SessionConfig};

fn compact(json: &str) -> String {
    json.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn golden_plan_records() {
    let session = Session::builtin(&SessionConfig::v0()).unwrap();
    let composed = session
        .compose(&["schema", "prov", "skos", "foaf"], ComposeOptions::default())
        .unwrap();

    let expected = r#"[
        {"primary":"schema","secondary":"prov",
         "plan":{"strategy":"property_scoped","property":"data"}},
        {"primary":"schema","secondary":"skos",
         "plan":{"strategy":"nested_contexts","outer":"schema","inner":"skos"}},
        {"primary":"schema","secondary":"foaf",
         "plan":{"strategy":"graph_partition","primary_graph":null,
                 "secondary_graph":"urn:graph:social"}}
    ]"#;

    assert_eq!(serde_json::to_string(composed.plans()).unwrap(), compact(expected));
}

#[test]
fn golden_signature_record() {
    let record = SignatureRecord {
        id: EntityId::new("urn:test:1"),
        vocab: vec![VocabPrefix::new("bioschemas").unwrap()],
        sha256: ContentDigest::from_content(b""),
        backend: BackendId {
            name: "urdna2015".into(),
            version: "0.1.0".into(),
            canonical: true,
        },
        canonical: true,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };

    let expected = r#"{
        "id":"urn:test:1",
        "vocab":["bioschemas"],
        "sha256":"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        "backend":{"name":"urdna2015","version":"0.1.0","canonical":true},
        "canonical":true,
        "created_at":"2024-01-01T00:00:00Z"
    }"#;

    let json = serde_json::to_string(&record).unwrap();
    assert_eq!(json, compact(expected));

    let back: SignatureRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn golden_entity_record_names_backend() {
    let session = Session::builtin(&SessionConfig::v0()).unwrap();
    let entity = session
        .entity_with_id(
            EntityId::new("urn:test:1"),
            &["bioschemas"],
            serde_json::json!({"name": "insulin"}),
        )
        .unwrap();

    let value: Value = serde_json::to_value(entity.record().unwrap()).unwrap();
    assert_eq!(value["backend"]["name"], "urdna2015");
    assert_eq!(value["backend"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["canonical"], true);
    assert_eq!(value["vocab"], serde_json::json!(["bioschemas"]));
}
