use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use vocab_context_core::registry::{VocabularyEntry, VocabularyRegistry};
use vocab_context_core::types::{EntityId, VocabPrefix};
use vocab_context_core::{Session, SessionConfig};

// Every key maps through @vocab, so no field is silently dropped.
fn open_session() -> Session {
    let Value::Object(context) = json!({"@vocab": "http://open.example/"}) else {
        unreachable!()
    };
    let mut registry = VocabularyRegistry::new();
    registry
        .register(VocabularyEntry::new(
            VocabPrefix::new("open").unwrap(),
            "http://open.example/",
            context,
        ))
        .unwrap();
    Session::new(registry, &SessionConfig::v0())
}

fn object_in_order<'a>(fields: impl Iterator<Item = (&'a String, &'a String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key.clone(), Value::String(value.clone()));
    }
    Value::Object(map)
}

fn sha256(session: &Session, content: Value) -> String {
    session
        .entity_with_id(EntityId::new("urn:test:prop"), &["open"], content)
        .unwrap()
        .sha256()
        .unwrap()
        .to_string()
}

fn fields() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9 ]{0,12}", 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_key_order_does_not_change_sha256(fields in fields()) {
        let session = open_session();
        let forward = object_in_order(fields.iter());
        let backward = object_in_order(fields.iter().rev());
        let nested_forward = json!({"outer": forward.clone(), "tag": "x"});
        let nested_backward = json!({"tag": "x", "outer": backward.clone()});

        prop_assert_eq!(sha256(&session, forward), sha256(&session, backward));
        prop_assert_eq!(sha256(&session, nested_forward), sha256(&session, nested_backward));
    }

    #[test]
    fn prop_single_leaf_change_changes_sha256(
        fields in fields(),
        pick in any::<prop::sample::Index>(),
    ) {
        let session = open_session();
        let original = object_in_order(fields.iter());

        let target = pick.get(&fields.keys().collect::<Vec<_>>()).to_string();
        let mut mutated_fields = fields.clone();
        if let Some(value) = mutated_fields.get_mut(&target) {
            value.push('!');
        }
        let mutated = object_in_order(mutated_fields.iter());

        prop_assert_ne!(sha256(&session, original), sha256(&session, mutated));
    }
}

#[test]
fn example_reordered_content_same_sha256() {
    let session = Session::builtin(&SessionConfig::v0()).unwrap();
    let make = |content: Value| {
        session
            .entity_with_id(EntityId::new("urn:test:1"), &["bioschemas"], content)
            .unwrap()
    };

    let first = make(json!({"name": "insulin", "@type": "Protein"}));
    let second = make(json!({"@type": "Protein", "name": "insulin"}));
    assert_eq!(first.sha256().unwrap(), second.sha256().unwrap());
    assert!(first.signature().unwrap().canonical);
}

#[test]
fn example_generated_ids_sign_differently() {
    let session = Session::builtin(&SessionConfig::v0()).unwrap();
    let content = json!({"name": "insulin", "@type": "Protein"});
    let first = session.entity(&["bioschemas"], content.clone()).unwrap();
    let second = session.entity(&["bioschemas"], content).unwrap();
    assert_ne!(first.id(), second.id());
    assert_ne!(first.sha256().unwrap(), second.sha256().unwrap());
}

#[test]
fn example_sha256_is_digest_of_normalized() {
    let session = Session::builtin(&SessionConfig::v0()).unwrap();
    let entity = session
        .entity_with_id(EntityId::new("urn:test:1"), &["bioschemas"], json!({"name": "insulin"}))
        .unwrap();
    let text = &entity.normalized().unwrap().text;
    let expected = vocab_context_core::ContentDigest::from_content(text.as_bytes());
    assert_eq!(entity.sha256().unwrap(), expected.as_str());
}
