//! Serialized deltas and the registry

use scribe_model::{
    Delta, DeltaFactory, DeltaKind, Document, Element, ModelError, Node, Position, SessionId,
};
use serde_json::json;

fn document() -> Document {
    let mut document = Document::new();
    document.create_root("main", "root").unwrap();
    let seed = Delta::insert(
        &document,
        Position::in_root("main", 0),
        vec![Node::Element(Element::new("p").with_children(vec![Node::text("abcd")]))],
    );
    document.apply_delta(&seed).unwrap();
    document
}

#[test]
fn test_serialized_delta_decodes_to_same_delta() {
    let document = document();
    let factory = DeltaFactory::with_builtin();
    let split = Delta::split(&document, &Position::new("main", vec![0, 2]).unwrap()).unwrap();

    let json = serde_json::to_string(&split).unwrap();
    let decoded = factory.from_json(&json).unwrap();
    assert_eq!(decoded, split);
    assert_eq!(decoded.kind(), DeltaKind::Split);
}

#[test]
fn test_decoded_remote_delta_applies() {
    let mut document = document();
    let factory = DeltaFactory::with_builtin();
    let delta = factory
        .from_value(json!({
            "className": "insert",
            "operations": [{
                "type": "insert",
                "position": { "root": "main", "path": [0, 4] },
                "nodes": [{ "type": "text", "data": "!", "attributes": { "bold": true } }],
                "baseVersion": 1
            }]
        }))
        .unwrap();
    document.apply_remote(delta, SessionId(7)).unwrap();

    let p = document.element_at("main", &[0]).unwrap();
    assert_eq!(p.text_content(), "abcd!");
    assert_eq!(p.children()[1].attribute("bold"), Some(&json!(true)));
}

#[test]
fn test_malformed_operations_rejected() {
    let factory = DeltaFactory::with_builtin();
    let err = factory
        .from_value(json!({
            "className": "remove",
            "operations": [{
                "type": "move",
                "source": { "root": "main", "path": [0, 1] },
                "howMany": 1,
                "target": { "root": "main", "path": [0, 3] },
                "baseVersion": 0
            }]
        }))
        .unwrap_err();
    assert!(matches!(err, ModelError::MalformedDelta { .. }));

    let err = factory
        .from_value(json!({
            "className": "insert",
            "operations": [{
                "type": "insert",
                "position": { "root": "main", "path": [] },
                "nodes": [],
                "baseVersion": 0
            }]
        }))
        .unwrap_err();
    assert!(matches!(err, ModelError::Serialization(_)));
}

#[test]
fn test_registry_tags_stay_unique() {
    let mut factory = DeltaFactory::with_builtin();
    for kind in DeltaKind::ALL {
        assert!(factory.register(kind).is_ok());
    }
    let err = factory.register_as("move", DeltaKind::Remove).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateDeltaKind { ref tag, .. } if tag == "move"));
}
