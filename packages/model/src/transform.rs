//! # Operational Transformation
//!
//! `transform(a, b)` rewrites operation `a` so that it can be applied after a
//! concurrent operation `b`, preserving `a`'s intent. Both sides of a pair are
//! transformed with opposite strength, so applying `a` then `b'` and `b` then
//! `a'` converge.
//!
//! ## Strength
//!
//! When two operations compete for the same spot the stronger one wins:
//!
//! 1. a sticky move beats a non-sticky operation
//! 2. then the higher delta priority wins
//! 3. then the lower session id wins
//!
//! Two operations of the same session are never stronger than each other.
//!
//! ## Results
//!
//! A transformed operation is a list: an operation can split into several
//! pieces or collapse into a single `NoOp`. The pieces apply in order.
//! Base versions of the results are left as they were; callers re-stamp them.
//!
//! ## Competing moves
//!
//! Only the weaker of two moves is rewritten. The stronger one takes the
//! weaker one back, applies itself as it was made and replays the weaker
//! one as rewritten for the other side:
//!
//! ```text
//! a' = [b⁻¹, a, b']      b' = transform(b, a, weak)
//! ```
//!
//! Both replicas then end with `a` followed by `b'`.

use serde::{Deserialize, Serialize};

use crate::node::width_of;
use crate::operation::Operation;
use crate::position::Position;
use crate::range::Range;

/// Identifier of an editing session (a local user, a peer, ...).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context deciding which of two competing operations wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieBreak {
    pub priority: i32,
    pub session: SessionId,
}

impl TieBreak {
    pub fn new(priority: i32, session: SessionId) -> Self {
        Self { priority, session }
    }
}

/// An operation together with the tie-break of the delta it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedOperation {
    pub operation: Operation,
    pub tie_break: TieBreak,
}

impl TaggedOperation {
    pub fn new(operation: Operation, tie_break: TieBreak) -> Self {
        Self {
            operation,
            tie_break,
        }
    }
}

pub fn is_stronger(a: &TaggedOperation, b: &TaggedOperation) -> bool {
    match (a.operation.is_sticky(), b.operation.is_sticky()) {
        (true, false) => return true,
        (false, true) => return false,
        _ => {}
    }
    if a.tie_break.priority != b.tie_break.priority {
        return a.tie_break.priority > b.tie_break.priority;
    }
    a.tie_break.session < b.tie_break.session
}

/// Transform `a` against an already applied concurrent `b`.
pub fn transform(a: &Operation, b: &Operation, strong: bool) -> Vec<Operation> {
    let base_version = a.base_version();
    if b.is_identity_move() {
        return vec![a.clone()];
    }
    if a.is_identity_move() {
        return vec![Operation::NoOp { base_version }];
    }
    match (a, b) {
        (Operation::NoOp { .. }, _) | (_, Operation::NoOp { .. }) => vec![a.clone()],

        (
            Operation::Insert {
                position, nodes, ..
            },
            Operation::Insert {
                position: at,
                nodes: inserted,
                ..
            },
        ) => vec![Operation::Insert {
            position: position.transformed_by_insertion(at, width_of(inserted), !strong),
            nodes: nodes.clone(),
            base_version,
        }],

        (
            Operation::Insert {
                position, nodes, ..
            },
            Operation::Move {
                source,
                how_many,
                target,
                is_sticky,
                ..
            },
        ) => vec![Operation::Insert {
            position: position.transformed_by_move(source, target, *how_many, !strong, *is_sticky),
            nodes: nodes.clone(),
            base_version,
        }],

        (
            Operation::Move { .. },
            Operation::Insert {
                position: at,
                nodes: inserted,
                ..
            },
        ) => vec![move_by_insertion(a, at, width_of(inserted), strong)],

        (Operation::Move { .. }, Operation::Move { .. }) if strong => {
            let mut operations = vec![b.reversed().with_base_version(base_version), a.clone()];
            operations.extend(
                move_by_move(b, a)
                    .into_iter()
                    .map(|operation| operation.with_base_version(base_version)),
            );
            operations
        }

        (Operation::Move { .. }, Operation::Move { .. }) => move_by_move(a, b),

        (
            Operation::Attribute { range, .. },
            Operation::Insert {
                position: at,
                nodes: inserted,
                ..
            },
        ) => attribute_pieces(a, range.transformed_by_insertion(at, width_of(inserted), false, false)),

        (
            Operation::Attribute { range, .. },
            Operation::Move {
                source,
                how_many,
                target,
                ..
            },
        ) => attribute_pieces(
            a,
            range.transformed_by_move(source, target, *how_many, false, false),
        ),

        (
            Operation::Attribute {
                range,
                key,
                old_value,
                new_value,
                ..
            },
            Operation::Attribute {
                range: other_range,
                key: other_key,
                new_value: other_new,
                ..
            },
        ) if key == other_key => {
            let Some(common) = range.intersection(other_range) else {
                return vec![a.clone()];
            };
            let mut pieces: Vec<Operation> = range
                .difference(other_range)
                .into_iter()
                .map(|piece| Operation::Attribute {
                    range: piece,
                    key: key.clone(),
                    old_value: old_value.clone(),
                    new_value: new_value.clone(),
                    base_version,
                })
                .collect();
            if strong {
                pieces.push(Operation::Attribute {
                    range: common,
                    key: key.clone(),
                    old_value: other_new.clone(),
                    new_value: new_value.clone(),
                    base_version,
                });
            }
            non_empty(pieces, base_version)
        }

        (
            Operation::RootAttribute {
                root,
                key,
                new_value,
                ..
            },
            Operation::RootAttribute {
                root: other_root,
                key: other_key,
                new_value: other_new,
                ..
            },
        ) if root == other_root && key == other_key => {
            if !strong {
                return vec![Operation::NoOp { base_version }];
            }
            vec![Operation::RootAttribute {
                root: root.clone(),
                key: key.clone(),
                old_value: other_new.clone(),
                new_value: new_value.clone(),
                base_version,
            }]
        }

        (
            Operation::Rename {
                position,
                old_name,
                new_name,
                ..
            },
            _,
        ) => rename_by(position, old_name, new_name, b, strong, base_version),

        (
            Operation::Marker {
                name,
                old_range,
                new_range,
                ..
            },
            _,
        ) => marker_by(name, old_range, new_range, b, strong, base_version),

        _ => vec![a.clone()],
    }
}

fn move_by_insertion(a: &Operation, at: &Position, inserted: usize, strong: bool) -> Operation {
    let Operation::Move {
        source,
        how_many,
        target,
        is_sticky,
        base_version,
    } = a
    else {
        return a.clone();
    };
    let end = source.offset() + how_many;
    let grows = at.has_same_parent_as(source)
        && ((source.offset() < at.offset() && at.offset() < end)
            || (*is_sticky && (at.offset() == source.offset() || at.offset() == end)));
    let (source, how_many) = if grows {
        (source.clone(), how_many + inserted)
    } else {
        (source.transformed_by_insertion(at, inserted, true), *how_many)
    };
    Operation::Move {
        source,
        how_many,
        target: target.transformed_by_insertion(at, inserted, !strong),
        is_sticky: *is_sticky,
        base_version: *base_version,
    }
}

/// `a` after the concurrent move `b`, giving way to `b` wherever the two
/// compete: content taken by both stays where `b` put it.
fn move_by_move(a: &Operation, b: &Operation) -> Vec<Operation> {
    let (
        Operation::Move {
            source,
            how_many,
            target,
            is_sticky,
            base_version,
        },
        Operation::Move {
            source: b_source,
            how_many: b_how_many,
            target: b_target,
            is_sticky: b_sticky,
            ..
        },
    ) = (a, b)
    else {
        return vec![a.clone()];
    };
    let noop = || {
        vec![Operation::NoOp {
            base_version: *base_version,
        }]
    };

    let range = Range::flat(source.clone(), *how_many);
    let b_range = Range::flat(b_source.clone(), *b_how_many);
    let new_target = target.transformed_by_move(b_source, b_target, *b_how_many, true, *b_sticky);

    let pieces: Vec<Range> = if range.intersection(&b_range).is_some() {
        range
            .difference(&b_range)
            .into_iter()
            .flat_map(|piece| piece.transformed_by_move(b_source, b_target, *b_how_many, false, false))
            .filter(|piece| !piece.is_collapsed())
            .collect()
    } else {
        range
            .transformed_by_move(b_source, b_target, *b_how_many, true, *is_sticky)
            .into_iter()
            .take(1)
            .collect()
    };
    if pieces.is_empty() {
        return noop();
    }
    if pieces
        .iter()
        .any(|piece| new_target.is_inside(&piece.start, piece.how_many()))
    {
        // b put the target inside the content a moves
        return noop();
    }
    sequence_moves(pieces, new_target, *is_sticky, *base_version)
}

/// Moves that bring `pieces` to `target` keeping their order. Pieces are
/// emitted last first: every later move lands in front of the earlier ones.
pub(crate) fn sequence_moves(
    pieces: Vec<Range>,
    target: Position,
    sticky: bool,
    base_version: u64,
) -> Vec<Operation> {
    let mut emitted: Vec<Operation> = Vec::with_capacity(pieces.len());
    for piece in pieces.into_iter().rev() {
        let mut source = piece.start.clone();
        let mut target = target.clone();
        for previous in &emitted {
            if let Operation::Move {
                source: previous_source,
                how_many,
                target: previous_target,
                ..
            } = previous
            {
                source = source.transformed_by_move(
                    previous_source,
                    previous_target,
                    *how_many,
                    true,
                    false,
                );
                target = target.transformed_by_move(
                    previous_source,
                    previous_target,
                    *how_many,
                    false,
                    false,
                );
            }
        }
        let how_many = piece.how_many();
        emitted.push(Operation::Move {
            source,
            how_many,
            target,
            is_sticky: sticky,
            base_version,
        });
    }
    emitted
}

fn attribute_pieces(a: &Operation, ranges: Vec<Range>) -> Vec<Operation> {
    let Operation::Attribute {
        key,
        old_value,
        new_value,
        base_version,
        ..
    } = a
    else {
        return vec![a.clone()];
    };
    let pieces = ranges
        .into_iter()
        .filter(|range| !range.is_collapsed())
        .map(|range| Operation::Attribute {
            range,
            key: key.clone(),
            old_value: old_value.clone(),
            new_value: new_value.clone(),
            base_version: *base_version,
        })
        .collect();
    non_empty(pieces, *base_version)
}

fn rename_by(
    position: &Position,
    old_name: &str,
    new_name: &str,
    b: &Operation,
    strong: bool,
    base_version: u64,
) -> Vec<Operation> {
    let rename = |position: Position, old_name: &str| Operation::Rename {
        position,
        old_name: old_name.to_string(),
        new_name: new_name.to_string(),
        base_version,
    };
    match b {
        Operation::Insert {
            position: at,
            nodes,
            ..
        } => vec![rename(
            position.transformed_by_insertion(at, width_of(nodes), true),
            old_name,
        )],
        Operation::Move {
            source,
            how_many,
            target,
            ..
        } => {
            let moved = Range::flat(position.clone(), 1)
                .transformed_by_move(source, target, *how_many, false, false)
                .into_iter()
                .next()
                .map(|range| range.start)
                .unwrap_or_else(|| position.clone());
            vec![rename(moved, old_name)]
        }
        Operation::Rename {
            position: other,
            new_name: other_new,
            ..
        } if other == position => {
            if strong {
                vec![rename(position.clone(), other_new)]
            } else {
                vec![Operation::NoOp { base_version }]
            }
        }
        _ => vec![rename(position.clone(), old_name)],
    }
}

fn marker_by(
    name: &str,
    old_range: &Option<Range>,
    new_range: &Option<Range>,
    b: &Operation,
    strong: bool,
    base_version: u64,
) -> Vec<Operation> {
    let marker = |old_range: Option<Range>, new_range: Option<Range>| Operation::Marker {
        name: name.to_string(),
        old_range,
        new_range,
        base_version,
    };
    match b {
        Operation::Insert {
            position: at,
            nodes,
            ..
        } => {
            let width = width_of(nodes);
            let by_insertion = |range: &Option<Range>| {
                range.as_ref().map(|range| range.marker_by_insertion(at, width))
            };
            vec![marker(by_insertion(old_range), by_insertion(new_range))]
        }
        Operation::Move {
            source,
            how_many,
            target,
            ..
        } => {
            let by_move = |range: &Option<Range>| {
                range
                    .as_ref()
                    .map(|range| range.marker_by_move(source, target, *how_many))
            };
            vec![marker(by_move(old_range), by_move(new_range))]
        }
        Operation::Marker {
            name: other,
            new_range: other_new,
            ..
        } if other == name => {
            if strong {
                vec![marker(other_new.clone(), new_range.clone())]
            } else {
                vec![Operation::NoOp { base_version }]
            }
        }
        _ => vec![marker(old_range.clone(), new_range.clone())],
    }
}

fn non_empty(pieces: Vec<Operation>, base_version: u64) -> Vec<Operation> {
    if pieces.is_empty() {
        vec![Operation::NoOp { base_version }]
    } else {
        pieces
    }
}

fn pad_with_noops(operations: &mut Vec<Operation>, len: usize) {
    let base_version = operations.last().map_or(0, Operation::base_version);
    while operations.len() < len {
        operations.push(Operation::NoOp { base_version });
    }
}

/// Transform a list of operations against an already applied list.
///
/// Returns `(a', b')`: `a'` applies after `b`, and `b'` is `b` as seen by
/// someone who applied `a` first. Every pairwise step rewrites both sides, so
/// later operations of `a` see `b` as rewritten by earlier ones.
pub fn transform_sequences(
    a: Vec<TaggedOperation>,
    b: Vec<TaggedOperation>,
) -> (Vec<TaggedOperation>, Vec<TaggedOperation>) {
    if a.is_empty() || b.is_empty() {
        return (a, b);
    }
    if a.len() == 1 && b.len() == 1 {
        let (a, b) = (&a[0], &b[0]);
        // exactly one side is strong; an equal pair leaves `b` in front
        let a_strong = is_stronger(a, b);
        let mut a_operations = transform(&a.operation, &b.operation, a_strong);
        let mut b_operations = transform(&b.operation, &a.operation, !a_strong);
        // both orders use up the same number of versions
        pad_with_noops(&mut a_operations, b_operations.len());
        pad_with_noops(&mut b_operations, a_operations.len());
        let tag = |operations: Vec<Operation>, tie_break: TieBreak| {
            operations
                .into_iter()
                .map(|operation| TaggedOperation::new(operation, tie_break))
                .collect::<Vec<_>>()
        };
        return (tag(a_operations, a.tie_break), tag(b_operations, b.tie_break));
    }
    if a.len() > 1 {
        let mut rest = a;
        let first = rest.remove(0);
        let (mut first, b) = transform_sequences(vec![first], b);
        let (rest, b) = transform_sequences(rest, b);
        first.extend(rest);
        return (first, b);
    }
    let mut rest = b;
    let first = rest.remove(0);
    let (a, mut first) = transform_sequences(a, vec![first]);
    let (a, rest) = transform_sequences(a, rest);
    first.extend(rest);
    (a, first)
}
