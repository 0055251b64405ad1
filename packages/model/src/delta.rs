//! # Deltas
//!
//! A delta is an ordered group of operations with one user-level meaning
//! (insert, remove, split, ...). It is the unit of undo, of transformation
//! priority and of serialization. Its kind is a closed enum: every kind
//! knows its wire tag, its transformation priority and the kind its
//! reversal produces.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::node::{Element, Node};
use crate::operation::Operation;
use crate::position::Position;
use crate::range::Range;
use crate::transform::{SessionId, TieBreak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Insert,
    Remove,
    Reinsert,
    Move,
    Split,
    Merge,
    Wrap,
    Unwrap,
    Attribute,
    RootAttribute,
    Rename,
    Marker,
}

impl DeltaKind {
    pub const ALL: [DeltaKind; 12] = [
        DeltaKind::Insert,
        DeltaKind::Remove,
        DeltaKind::Reinsert,
        DeltaKind::Move,
        DeltaKind::Split,
        DeltaKind::Merge,
        DeltaKind::Wrap,
        DeltaKind::Unwrap,
        DeltaKind::Attribute,
        DeltaKind::RootAttribute,
        DeltaKind::Rename,
        DeltaKind::Marker,
    ];

    /// Stable identifier used on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            DeltaKind::Insert => "insert",
            DeltaKind::Remove => "remove",
            DeltaKind::Reinsert => "reinsert",
            DeltaKind::Move => "move",
            DeltaKind::Split => "split",
            DeltaKind::Merge => "merge",
            DeltaKind::Wrap => "wrap",
            DeltaKind::Unwrap => "unwrap",
            DeltaKind::Attribute => "attribute",
            DeltaKind::RootAttribute => "rootAttribute",
            DeltaKind::Rename => "rename",
            DeltaKind::Marker => "marker",
        }
    }

    pub fn from_tag(tag: &str) -> Option<DeltaKind> {
        DeltaKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Transformation priority; higher wins a tie.
    pub fn priority(self) -> i32 {
        match self {
            DeltaKind::Insert | DeltaKind::Move => 0,
            DeltaKind::Marker => 1,
            DeltaKind::Attribute | DeltaKind::RootAttribute | DeltaKind::Rename => 5,
            DeltaKind::Remove | DeltaKind::Reinsert => 10,
            DeltaKind::Wrap | DeltaKind::Unwrap => 15,
            DeltaKind::Split | DeltaKind::Merge => 20,
        }
    }

    /// Kind of the delta produced by reversing a delta of this kind.
    pub fn reverse(self) -> DeltaKind {
        match self {
            DeltaKind::Insert => DeltaKind::Remove,
            DeltaKind::Remove => DeltaKind::Reinsert,
            DeltaKind::Reinsert => DeltaKind::Remove,
            DeltaKind::Move => DeltaKind::Move,
            DeltaKind::Split => DeltaKind::Merge,
            DeltaKind::Merge => DeltaKind::Split,
            DeltaKind::Wrap => DeltaKind::Unwrap,
            DeltaKind::Unwrap => DeltaKind::Wrap,
            DeltaKind::Attribute => DeltaKind::Attribute,
            DeltaKind::RootAttribute => DeltaKind::RootAttribute,
            DeltaKind::Rename => DeltaKind::Rename,
            DeltaKind::Marker => DeltaKind::Marker,
        }
    }

    /// Give the operations of a freshly reversed delta the flags a delta of
    /// the reverse kind is built with.
    fn restore_flags(self, operations: &mut [Operation]) {
        let (index, sticky) = match self {
            DeltaKind::Split => (0, true),
            DeltaKind::Merge => (1, true),
            DeltaKind::Wrap => (0, true),
            DeltaKind::Unwrap => (1, false),
            _ => return,
        };
        if let Some(operation) = operations.get_mut(index) {
            operation.set_sticky(sticky);
        }
    }

    fn accepts(self, operation: &Operation) -> bool {
        match (self, operation) {
            (_, Operation::NoOp { .. }) => true,
            (DeltaKind::Insert, Operation::Insert { .. }) => true,
            (DeltaKind::Remove, operation @ Operation::Move { .. }) => operation.is_remove(),
            (DeltaKind::Reinsert, Operation::Move { source, .. }) => {
                source.root() == crate::position::GRAVEYARD
            }
            (DeltaKind::Move, Operation::Move { .. }) => true,
            (
                DeltaKind::Split | DeltaKind::Merge | DeltaKind::Wrap | DeltaKind::Unwrap,
                Operation::Insert { .. } | Operation::Move { .. },
            ) => true,
            (DeltaKind::Attribute, Operation::Attribute { .. }) => true,
            (DeltaKind::RootAttribute, Operation::RootAttribute { .. }) => true,
            (DeltaKind::Rename, Operation::Rename { .. }) => true,
            (DeltaKind::Marker, Operation::Marker { .. }) => true,
            _ => false,
        }
    }

    /// Rebuild a delta of this kind from decoded operations, checking that
    /// the operations fit the kind.
    pub fn reconstruct(self, operations: Vec<Operation>) -> ModelResult<Delta> {
        let malformed = |reason: String| ModelError::MalformedDelta {
            class_name: self.tag().to_string(),
            reason,
        };
        if operations.is_empty() {
            return Err(malformed("delta has no operations".to_string()));
        }
        if let Some(operation) = operations.iter().find(|operation| !self.accepts(operation)) {
            return Err(malformed(format!(
                "unexpected {} operation",
                operation.kind_name()
            )));
        }
        for (window, index) in operations.windows(2).zip(1..) {
            if window[1].base_version() != window[0].base_version() + 1 {
                return Err(malformed(format!(
                    "operation {index} has base version {}, expected {}",
                    window[1].base_version(),
                    window[0].base_version() + 1
                )));
            }
        }
        Ok(Delta::new(self, operations))
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Wire form of a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDelta {
    pub class_name: String,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "SerializedDelta")]
pub struct Delta {
    kind: DeltaKind,
    operations: Vec<Operation>,
}

impl From<Delta> for SerializedDelta {
    fn from(delta: Delta) -> Self {
        SerializedDelta {
            class_name: delta.kind.tag().to_string(),
            operations: delta.operations,
        }
    }
}

impl Delta {
    pub(crate) fn new(kind: DeltaKind, operations: Vec<Operation>) -> Self {
        Self { kind, operations }
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Base version of the first operation.
    pub fn base_version(&self) -> Option<u64> {
        self.operations.first().map(Operation::base_version)
    }

    /// Re-stamp the operations with consecutive versions starting at
    /// `version`.
    pub fn with_base_version(mut self, version: u64) -> Self {
        for (operation, version) in self.operations.iter_mut().zip(version..) {
            operation.set_base_version(version);
        }
        self
    }

    pub fn tie_break(&self, session: SessionId) -> TieBreak {
        TieBreak::new(self.kind.priority(), session)
    }

    /// The delta that undoes this one, valid right after this one was
    /// applied.
    pub fn reversed(&self) -> Delta {
        let mut operations: Vec<Operation> =
            self.operations.iter().rev().map(Operation::reversed).collect();
        if let Some(last) = self.operations.last() {
            for (operation, version) in operations.iter_mut().zip(last.base_version() + 1..) {
                operation.set_base_version(version);
            }
        }
        self.kind.restore_flags(&mut operations);
        Delta::new(self.kind.reverse(), operations)
    }

    /// The position this delta is about, derived from its operations.
    pub fn position(&self) -> Option<Position> {
        let insert_position = || {
            self.operations.iter().find_map(|operation| match operation {
                Operation::Insert { position, .. } => Some(position.clone()),
                _ => None,
            })
        };
        let move_sources = || {
            self.operations.iter().filter_map(|operation| match operation {
                Operation::Move { source, .. } => Some(source.clone()),
                _ => None,
            })
        };
        match self.kind {
            DeltaKind::Insert | DeltaKind::Wrap => insert_position(),
            DeltaKind::Split => move_sources().last(),
            DeltaKind::Merge | DeltaKind::Unwrap => self
                .operations
                .iter()
                .find(|operation| operation.is_remove())
                .and_then(|operation| match operation {
                    Operation::Move { source, .. } => Some(source.clone()),
                    _ => None,
                }),
            DeltaKind::Move | DeltaKind::Remove | DeltaKind::Reinsert => move_sources().next(),
            DeltaKind::Rename => self.operations.iter().find_map(|operation| match operation {
                Operation::Rename { position, .. } => Some(position.clone()),
                _ => None,
            }),
            DeltaKind::Attribute | DeltaKind::RootAttribute | DeltaKind::Marker => None,
        }
    }
}

/// Construction of deltas against the current state of a document. The
/// operations are stamped with consecutive versions starting at the
/// document's version.
impl Delta {
    pub fn insert(document: &Document, position: Position, nodes: Vec<Node>) -> Delta {
        Delta::new(
            DeltaKind::Insert,
            vec![Operation::Insert {
                position,
                nodes,
                base_version: document.version(),
            }],
        )
    }

    pub fn remove(document: &Document, range: &Range) -> ModelResult<Delta> {
        require_flat(range)?;
        Ok(Delta::new(
            DeltaKind::Remove,
            vec![Operation::Move {
                source: range.start.clone(),
                how_many: range.how_many(),
                target: Position::graveyard_start(),
                is_sticky: false,
                base_version: document.version(),
            }],
        ))
    }

    /// Move a flat range to `target`. A move that would leave everything in
    /// place (an empty range, or a target at one of the range's ends) is
    /// rejected.
    pub fn move_range(document: &Document, range: &Range, target: Position) -> ModelResult<Delta> {
        require_flat(range)?;
        let operation = Operation::Move {
            source: range.start.clone(),
            how_many: range.how_many(),
            target,
            is_sticky: false,
            base_version: document.version(),
        };
        if operation.is_identity_move() {
            return Err(ModelError::invalid_location(
                range.root(),
                range.start.path(),
                "move leaves the range where it is",
            ));
        }
        Ok(Delta::new(DeltaKind::Move, vec![operation]))
    }

    /// Set (`Some`) or remove (`None`) an attribute on a flat range. The
    /// range is cut into runs sharing the same current value; runs that
    /// already hold the value are skipped. `None` when nothing changes,
    /// which includes a collapsed range.
    pub fn attribute(
        document: &Document,
        range: &Range,
        key: &str,
        value: Option<Value>,
    ) -> ModelResult<Option<Delta>> {
        require_flat(range)?;
        if range.is_collapsed() {
            return Ok(None);
        }
        let parent = document.element_at(range.root(), range.start.parent_path())?;
        let (from, to) = (range.start.offset(), range.end.offset());
        if to > parent.max_offset() {
            return Err(ModelError::invalid_location(
                range.root(),
                range.end.path(),
                "attribute range exceeds its parent",
            ));
        }

        let mut runs: Vec<(usize, usize, Option<Value>)> = Vec::new();
        let mut start = 0;
        for child in parent.children() {
            let end = start + child.width();
            if start < to && from < end {
                let old = child.attribute(key).cloned();
                let (run_start, run_end) = (start.max(from), end.min(to));
                match runs.last_mut() {
                    Some((_, last_end, last_old)) if *last_old == old => *last_end = run_end,
                    _ => runs.push((run_start, run_end, old)),
                }
            }
            start = end;
        }

        let operations: Vec<Operation> = runs
            .into_iter()
            .filter(|(_, _, old)| *old != value)
            .zip(document.version()..)
            .map(|((run_start, run_end, old), base_version)| Operation::Attribute {
                range: Range::flat(range.start.with_offset(run_start), run_end - run_start),
                key: key.to_string(),
                old_value: old,
                new_value: value.clone(),
                base_version,
            })
            .collect();
        if operations.is_empty() {
            return Ok(None);
        }
        Ok(Some(Delta::new(DeltaKind::Attribute, operations)))
    }

    pub fn root_attribute(
        document: &Document,
        root: &str,
        key: &str,
        value: Option<Value>,
    ) -> ModelResult<Delta> {
        let old_value = document.root(root)?.attributes.get(key).cloned();
        Ok(Delta::new(
            DeltaKind::RootAttribute,
            vec![Operation::RootAttribute {
                root: root.to_string(),
                key: key.to_string(),
                old_value,
                new_value: value,
                base_version: document.version(),
            }],
        ))
    }

    pub fn rename(document: &Document, position: Position, new_name: &str) -> ModelResult<Delta> {
        let old_name = document.element_at(position.root(), position.path())?.name.clone();
        Ok(Delta::new(
            DeltaKind::Rename,
            vec![Operation::Rename {
                position,
                old_name,
                new_name: new_name.to_string(),
                base_version: document.version(),
            }],
        ))
    }

    /// Split the element containing `position` in two: an empty copy of the
    /// element is inserted after it and everything after `position` is
    /// moved into the copy.
    pub fn split(document: &Document, position: &Position) -> ModelResult<Delta> {
        let Some(element_position) = position.parent_position() else {
            return Err(ModelError::CannotSplitRoot {
                root: position.root().to_string(),
                path: position.path().to_vec(),
            });
        };
        let element = document.element_at(position.root(), position.parent_path())?;
        let max_offset = element.max_offset();
        if position.offset() > max_offset {
            return Err(ModelError::invalid_location(
                position.root(),
                position.path(),
                format!("offset exceeds element width {max_offset}"),
            ));
        }

        let copy_position = element_position.with_offset(element_position.offset() + 1);
        let version = document.version();
        Ok(Delta::new(
            DeltaKind::Split,
            vec![
                Operation::Insert {
                    position: copy_position.clone(),
                    nodes: vec![Node::Element(element.empty_copy())],
                    base_version: version,
                },
                Operation::Move {
                    source: position.clone(),
                    how_many: max_offset - position.offset(),
                    target: copy_position.descend(0),
                    is_sticky: true,
                    base_version: version + 1,
                },
            ],
        ))
    }

    /// Merge the elements on both sides of `position`: the children of the
    /// second one are moved to the end of the first, then the emptied
    /// element is removed.
    pub fn merge(document: &Document, position: &Position) -> ModelResult<Delta> {
        let nothing_to_merge = || ModelError::NothingToMerge {
            root: position.root().to_string(),
            path: position.path().to_vec(),
        };
        let offset = position.offset();
        if offset == 0 {
            return Err(nothing_to_merge());
        }
        let parent = document.element_at(position.root(), position.parent_path())?;
        let previous = parent
            .element_at_offset(offset - 1)
            .ok_or_else(nothing_to_merge)?;
        let next = parent.element_at_offset(offset).ok_or_else(nothing_to_merge)?;

        let version = document.version();
        Ok(Delta::new(
            DeltaKind::Merge,
            vec![
                Operation::Move {
                    source: position.descend(0),
                    how_many: next.max_offset(),
                    target: position.with_offset(offset - 1).descend(previous.max_offset()),
                    is_sticky: true,
                    base_version: version,
                },
                Operation::Move {
                    source: position.clone(),
                    how_many: 1,
                    target: Position::graveyard_start(),
                    is_sticky: false,
                    base_version: version + 1,
                },
            ],
        ))
    }

    /// Wrap a flat range in `element`, which must have no children.
    pub fn wrap(document: &Document, range: &Range, element: Element) -> ModelResult<Delta> {
        require_flat(range)?;
        if !element.is_empty() {
            return Err(ModelError::WrapperNotEmpty {
                children: element.child_count(),
            });
        }
        let parent = document.element_at(range.root(), range.start.parent_path())?;
        if range.end.offset() > parent.max_offset() {
            return Err(ModelError::invalid_location(
                range.root(),
                range.end.path(),
                "wrapped range exceeds its parent",
            ));
        }

        let version = document.version();
        Ok(Delta::new(
            DeltaKind::Wrap,
            vec![
                Operation::Insert {
                    position: range.end.clone(),
                    nodes: vec![Node::Element(element)],
                    base_version: version,
                },
                Operation::Move {
                    source: range.start.clone(),
                    how_many: range.how_many(),
                    target: range.end.descend(0),
                    is_sticky: false,
                    base_version: version + 1,
                },
            ],
        ))
    }

    /// Replace the element starting at `position` with its children.
    pub fn unwrap(document: &Document, position: &Position) -> ModelResult<Delta> {
        let element = document.element_at(position.root(), position.path())?;
        let how_many = element.max_offset();
        let version = document.version();
        Ok(Delta::new(
            DeltaKind::Unwrap,
            vec![
                Operation::Move {
                    source: position.descend(0),
                    how_many,
                    target: position.clone(),
                    is_sticky: true,
                    base_version: version,
                },
                Operation::Move {
                    source: position.with_offset(position.offset() + how_many),
                    how_many: 1,
                    target: Position::graveyard_start(),
                    is_sticky: false,
                    base_version: version + 1,
                },
            ],
        ))
    }

    /// Set (`Some`) or remove (`None`) the marker `name`.
    pub fn marker(document: &Document, name: &str, range: Option<Range>) -> ModelResult<Delta> {
        if let Some(range) = &range {
            document.root(range.root())?;
        }
        Ok(Delta::new(
            DeltaKind::Marker,
            vec![Operation::Marker {
                name: name.to_string(),
                old_range: document.marker(name).cloned(),
                new_range: range,
                base_version: document.version(),
            }],
        ))
    }
}

fn require_flat(range: &Range) -> ModelResult<()> {
    if !range.is_flat() {
        return Err(ModelError::invalid_location(
            range.root(),
            range.start.path(),
            "range must be flat",
        ));
    }
    Ok(())
}
