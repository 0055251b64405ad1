//! Document-level behaviour: applying deltas, reversing them, markers

use scribe_model::{
    Delta, DeltaKind, Document, Element, ModelError, Node, Position, Range, UndoStack,
};
use serde_json::json;

fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec()).unwrap()
}

fn paragraph(name: &str, text: &str) -> Node {
    Node::Element(Element::new(name).with_children(vec![Node::text(text)]))
}

fn document_with(nodes: Vec<Node>) -> Document {
    let mut document = Document::new();
    document.create_root("main", "root").unwrap();
    let seed = Delta::insert(&document, pos(&[0]), nodes);
    document.apply_delta(&seed).unwrap();
    document
}

fn texts(document: &Document) -> Vec<String> {
    document
        .root("main")
        .unwrap()
        .children()
        .iter()
        .map(|node| match node {
            Node::Element(element) => format!("{}:{}", element.name, element.text_content()),
            Node::Text(text) => text.data.clone(),
        })
        .collect()
}

/// Apply a delta, then its reversal, and check the roots are back.
fn assert_reversible(document: &mut Document, delta: Delta) {
    let before = document.snapshot().roots;
    let version = document.version();
    let count = delta.operations().len() as u64;

    document.apply_delta(&delta).unwrap();
    assert_eq!(document.version(), version + count);

    let reversed = delta.reversed();
    assert_eq!(reversed.kind(), delta.kind().reverse());
    document.apply_delta(&reversed).unwrap();
    assert_eq!(document.version(), version + 2 * count);
    assert_eq!(document.snapshot().roots, before);
}

#[test]
fn test_split_paragraph() {
    let mut document = document_with(vec![paragraph("p", "abcd")]);
    let delta = Delta::split(&document, &pos(&[0, 2])).unwrap();
    assert_eq!(delta.kind(), DeltaKind::Split);
    assert_eq!(delta.position(), Some(pos(&[0, 2])));

    document.apply_delta(&delta).unwrap();
    assert_eq!(texts(&document), vec!["p:ab", "p:cd"]);
}

#[test]
fn test_split_copies_attributes() {
    let element = Element::new("p")
        .with_attribute("align", json!("center"))
        .with_children(vec![Node::text("abcd")]);
    let mut document = document_with(vec![Node::Element(element)]);
    document.batch().split(&pos(&[0, 1])).unwrap();
    let copy = document.element_at("main", &[1]).unwrap();
    assert_eq!(copy.attributes.get("align"), Some(&json!("center")));
    assert_eq!(copy.text_content(), "bcd");
}

#[test]
fn test_split_root_rejected() {
    let document = document_with(vec![paragraph("p", "abcd")]);
    let err = Delta::split(&document, &pos(&[0])).unwrap_err();
    assert!(matches!(err, ModelError::CannotSplitRoot { .. }));
}

#[test]
fn test_merge_paragraphs() {
    let mut document = document_with(vec![paragraph("p", "ab"), paragraph("p", "cd")]);
    document.batch().merge(&pos(&[1])).unwrap();
    assert_eq!(texts(&document), vec!["p:abcd"]);
    assert_eq!(document.graveyard().unwrap().child_count(), 1);

    let err = Delta::merge(&document, &pos(&[1])).unwrap_err();
    assert!(matches!(err, ModelError::NothingToMerge { .. }));
}

#[test]
fn test_wrap_and_unwrap() {
    let mut document = document_with(vec![paragraph("p", "abcd")]);
    document
        .batch()
        .wrap(&Range::flat(pos(&[0, 1]), 2), Element::new("strong"))
        .unwrap();
    let p = document.element_at("main", &[0]).unwrap();
    assert_eq!(p.child_count(), 3);
    assert_eq!(document.element_at("main", &[0, 1]).unwrap().text_content(), "bc");

    document.batch().unwrap(&pos(&[0, 1])).unwrap();
    assert_eq!(texts(&document), vec!["p:abcd"]);
    assert_eq!(document.element_at("main", &[0]).unwrap().child_count(), 1);
}

#[test]
fn test_wrap_requires_empty_element() {
    let document = document_with(vec![paragraph("p", "abcd")]);
    let wrapper = Element::new("strong").with_children(vec![Node::text("x")]);
    let err = Delta::wrap(&document, &Range::flat(pos(&[0, 0]), 1), wrapper).unwrap_err();
    assert!(matches!(err, ModelError::WrapperNotEmpty { children: 1 }));
}

#[test]
fn test_every_kind_is_reversible() {
    let mut document = document_with(vec![paragraph("p", "abcd"), paragraph("p", "ef")]);

    let delta = Delta::insert(&document, pos(&[1, 1]), vec![Node::text("xyz")]);
    assert_reversible(&mut document, delta);

    let delta = Delta::remove(&document, &Range::flat(pos(&[0, 1]), 2)).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::move_range(&document, &Range::flat(pos(&[0, 0]), 3), pos(&[1, 1])).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::split(&document, &pos(&[0, 3])).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::merge(&document, &pos(&[1])).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::wrap(&document, &Range::flat(pos(&[0, 1]), 2), Element::new("em")).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::attribute(&document, &Range::flat(pos(&[0, 0]), 4), "bold", Some(json!(true)))
        .unwrap()
        .unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::root_attribute(&document, "main", "lang", Some(json!("en"))).unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::rename(&document, pos(&[1]), "h1").unwrap();
    assert_reversible(&mut document, delta);

    let delta = Delta::marker(&document, "comment", Some(Range::flat(pos(&[0, 1]), 2))).unwrap();
    assert_reversible(&mut document, delta);
}

#[test]
fn test_unwrap_reverses_to_wrap() {
    let mut document = document_with(vec![paragraph("b", "xy")]);
    let delta = Delta::unwrap(&document, &pos(&[0])).unwrap();
    document.apply_delta(&delta).unwrap();
    assert_eq!(texts(&document), vec!["xy"]);

    let reversed = delta.reversed();
    assert_eq!(reversed.kind(), DeltaKind::Wrap);
    assert!(!reversed.operations()[1].is_sticky());
    document.apply_delta(&reversed).unwrap();
    assert_eq!(texts(&document), vec!["b:xy"]);
}

#[test]
fn test_markers_follow_content() {
    let mut document = document_with(vec![paragraph("p", "abcdef")]);
    document
        .batch()
        .set_marker("search", Range::flat(pos(&[0, 3]), 2))
        .unwrap()
        .insert_text(pos(&[0, 0]), "__")
        .unwrap();
    assert_eq!(document.marker("search"), Some(&Range::flat(pos(&[0, 5]), 2)));

    document.batch().remove(&Range::flat(pos(&[0, 0]), 4)).unwrap();
    assert_eq!(document.marker("search"), Some(&Range::flat(pos(&[0, 1]), 2)));

    document.batch().remove_marker("search").unwrap();
    assert_eq!(document.marker("search"), None);
}

#[test]
fn test_attribute_mismatch_rejected() {
    let mut document = document_with(vec![paragraph("p", "abcd")]);
    let stale = Delta::attribute(&document, &Range::flat(pos(&[0, 0]), 2), "bold", Some(json!(1)))
        .unwrap()
        .unwrap();
    document
        .batch()
        .set_attribute(&Range::flat(pos(&[0, 0]), 4), "bold", json!(2))
        .unwrap();
    let stale = stale.with_base_version(document.version());
    let err = document.apply_delta(&stale).unwrap_err();
    assert!(matches!(err, ModelError::AttributeMismatch { .. }));
}

#[test]
fn test_move_into_itself_rejected() {
    let mut document = document_with(vec![paragraph("p", "ab"), paragraph("p", "cd")]);
    let version = document.version();
    let err = document
        .batch()
        .move_range(&Range::flat(pos(&[0]), 2), pos(&[1, 1]))
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidLocation { .. }));
    assert_eq!(document.version(), version);
}

#[test]
fn test_undo_redo_split() {
    let mut document = document_with(vec![paragraph("p", "abcd")]);
    let mut undo = UndoStack::new();
    let batch = document.batch().split(&pos(&[0, 2])).unwrap().commit();
    undo.record(batch);
    assert_eq!(texts(&document), vec!["p:ab", "p:cd"]);

    undo.undo(&mut document).unwrap();
    assert_eq!(texts(&document), vec!["p:abcd"]);

    undo.redo(&mut document).unwrap();
    assert_eq!(texts(&document), vec!["p:ab", "p:cd"]);

    undo.undo(&mut document).unwrap();
    assert_eq!(texts(&document), vec!["p:abcd"]);
}
