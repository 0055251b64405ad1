//! Transformation benchmarks
//!
//! Target: rebase a remote delta over 1000 history entries in <5ms

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scribe_model::{Delta, Document, Element, Node, Position, SessionId};

fn paragraph_document(paragraphs: usize) -> Document {
    let mut document = Document::new();
    document.create_root("main", "root").unwrap();
    let nodes = (0..paragraphs)
        .map(|i| {
            Node::Element(
                Element::new("p").with_children(vec![Node::text(format!("Paragraph number {i}"))]),
            )
        })
        .collect();
    let seed = Delta::insert(&document, Position::in_root("main", 0), nodes);
    document.apply_delta(&seed).unwrap();
    document
}

/// A document whose history holds `edits` local inserts made after `base`.
fn document_with_history(edits: usize) -> (Document, u64) {
    let mut document = paragraph_document(100);
    let base = document.version();
    for i in 0..edits {
        let position = Position::new("main", vec![i % 100, 0]).unwrap();
        let delta = Delta::insert(&document, position, vec![Node::text("x")]);
        document.apply_delta(&delta).unwrap();
    }
    (document, base)
}

fn bench_transform_against_history(c: &mut Criterion) {
    let (document, base) = document_with_history(1000);
    let remote = Delta::split(
        &paragraph_document(100),
        &Position::new("main", vec![50, 5]).unwrap(),
    )
    .unwrap()
    .with_base_version(base);

    c.bench_function("transform_split_over_1000_inserts", |b| {
        b.iter(|| document.transform_delta(black_box(remote.clone()), SessionId(2)))
    });
}

fn bench_split_merge(c: &mut Criterion) {
    c.bench_function("split_then_merge", |b| {
        b.iter_batched(
            || paragraph_document(100),
            |mut document| {
                let position = Position::new("main", vec![10, 4]).unwrap();
                let split = Delta::split(&document, &position).unwrap();
                document.apply_delta(&split).unwrap();
                let merge = Delta::merge(&document, &Position::in_root("main", 11)).unwrap();
                document.apply_delta(&merge).unwrap();
                black_box(document)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_transform_against_history, bench_split_merge);
criterion_main!(benches);
