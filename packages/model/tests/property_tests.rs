//! Seeded random edits: concurrent pairs must converge, and undoing a run
//! of batches must give back the tree it started from.

use rand::{rngs::StdRng, Rng, SeedableRng};
use scribe_model::{
    Batch, BatchId, BatchType, Delta, Document, DocumentOptions, Element, Node, Position, Range,
    SessionId, UndoStack,
};
use serde_json::json;

const RUNS: u64 = 300;

fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec()).unwrap()
}

fn word(rng: &mut StdRng) -> String {
    let length = rng.gen_range(1..=4);
    (0..length).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

fn seed_nodes(rng: &mut StdRng) -> Vec<Node> {
    (0..rng.gen_range(1..=4))
        .map(|_| Node::Element(Element::new("p").with_children(vec![Node::text(word(rng))])))
        .collect()
}

fn replica(session: u64, seed: &[Node]) -> Document {
    let mut document = Document::with_options(DocumentOptions {
        history_limit: None,
        session: SessionId(session),
    });
    document.create_root("main", "root").unwrap();
    let delta = Delta::insert(&document, pos(&[0]), seed.to_vec());
    document.apply_delta(&delta).unwrap();
    document
}

fn lengths(document: &Document) -> Vec<usize> {
    document
        .root("main")
        .unwrap()
        .children()
        .iter()
        .filter_map(Node::as_element)
        .map(Element::max_offset)
        .collect()
}

/// A flat span of at least one offset in a parent `length` wide.
fn span(rng: &mut StdRng, length: usize) -> Option<(usize, usize)> {
    if length == 0 {
        return None;
    }
    let start = rng.gen_range(0..length);
    Some((start, rng.gen_range(1..=length - start)))
}

/// A random edit that is valid on `document`, or `None` when the pick does
/// not fit the current tree.
fn random_delta(rng: &mut StdRng, document: &Document) -> Option<Delta> {
    let lengths = lengths(document);
    if lengths.is_empty() {
        let paragraph = Node::Element(Element::new("p").with_children(vec![Node::text(word(rng))]));
        return Some(Delta::insert(document, pos(&[0]), vec![paragraph]));
    }
    let p = rng.gen_range(0..lengths.len());

    match rng.gen_range(0..10) {
        0 => {
            let offset = rng.gen_range(0..=lengths[p]);
            Some(Delta::insert(document, pos(&[p, offset]), vec![Node::text(word(rng))]))
        }
        1 => {
            let (start, how_many) = span(rng, lengths[p])?;
            Delta::remove(document, &Range::flat(pos(&[p, start]), how_many)).ok()
        }
        2 => {
            let (start, how_many) = span(rng, lengths.len())?;
            Delta::remove(document, &Range::flat(pos(&[start]), how_many)).ok()
        }
        3 => {
            let (start, how_many) = span(rng, lengths[p])?;
            let q = rng.gen_range(0..lengths.len());
            let offset = rng.gen_range(0..=lengths[q]);
            if q == p && (start..=start + how_many).contains(&offset) {
                return None;
            }
            Delta::move_range(document, &Range::flat(pos(&[p, start]), how_many), pos(&[q, offset]))
                .ok()
        }
        4 => {
            let (start, how_many) = span(rng, lengths.len())?;
            let offset = rng.gen_range(0..=lengths.len());
            if (start..=start + how_many).contains(&offset) {
                return None;
            }
            Delta::move_range(document, &Range::flat(pos(&[start]), how_many), pos(&[offset])).ok()
        }
        5 => {
            let offset = rng.gen_range(0..=lengths[p]);
            Delta::split(document, &pos(&[p, offset])).ok()
        }
        6 if lengths.len() > 1 => {
            let at = rng.gen_range(1..lengths.len());
            Delta::merge(document, &pos(&[at])).ok()
        }
        7 => {
            let (start, how_many) = span(rng, lengths[p])?;
            let value = json!(rng.gen_range(0..3));
            Delta::attribute(document, &Range::flat(pos(&[p, start]), how_many), "bold", Some(value))
                .ok()
                .flatten()
        }
        8 => {
            let name = ["p", "h1", "h2"][rng.gen_range(0..3)];
            Delta::rename(document, pos(&[p]), name).ok()
        }
        9 => {
            let lang = ["en", "fr", "de"][rng.gen_range(0..3)];
            Delta::root_attribute(document, "main", "lang", Some(json!(lang))).ok()
        }
        _ => None,
    }
}

#[test]
fn test_concurrent_pairs_converge() {
    for seed in 0..RUNS {
        let mut rng = StdRng::seed_from_u64(seed);
        let nodes = seed_nodes(&mut rng);
        let mut one = replica(1, &nodes);
        let mut two = replica(2, &nodes);

        let (Some(left), Some(right)) = (random_delta(&mut rng, &one), random_delta(&mut rng, &two))
        else {
            continue;
        };
        one.apply_delta(&left).unwrap();
        two.apply_delta(&right).unwrap();

        one.apply_remote(right.clone(), SessionId(2))
            .unwrap_or_else(|e| panic!("seed {seed}: {left:?} then {right:?}: {e}"));
        two.apply_remote(left.clone(), SessionId(1))
            .unwrap_or_else(|e| panic!("seed {seed}: {right:?} then {left:?}: {e}"));

        assert_eq!(one.snapshot().roots, two.snapshot().roots, "seed {seed}");
        assert_eq!(one.graveyard().unwrap(), two.graveyard().unwrap(), "seed {seed}");
        assert_eq!(one.version(), two.version(), "seed {seed}");
    }
}

#[test]
fn test_undo_all_batches_restores_tree() {
    for seed in 0..RUNS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut document = replica(1, &seed_nodes(&mut rng));
        let mut undo = UndoStack::new();
        let before = document.snapshot().roots;

        for id in 0..rng.gen_range(1..=3) {
            let mut batch = Batch::new(BatchId(id), BatchType::Default);
            for _ in 0..rng.gen_range(1..=4) {
                if let Some(delta) = random_delta(&mut rng, &document) {
                    document.apply_delta(&delta).unwrap();
                    batch.deltas.push(delta);
                }
            }
            undo.record(batch);
        }
        let after = document.snapshot().roots;

        while undo.can_undo() {
            undo.undo(&mut document)
                .unwrap_or_else(|e| panic!("seed {seed}: undo failed: {e}"));
        }
        assert_eq!(document.snapshot().roots, before, "seed {seed}");

        while undo.can_redo() {
            undo.redo(&mut document)
                .unwrap_or_else(|e| panic!("seed {seed}: redo failed: {e}"));
        }
        assert_eq!(document.snapshot().roots, after, "seed {seed}");
    }
}
