//! # Operations
//!
//! The smallest invertible, versioned mutation units. Every operation
//! records the document version it expects to be applied against; applying
//! it bumps the version by exactly one.
//!
//! Removal is not a separate operation: removed content is moved into the
//! graveyard root, so it can be brought back by moving it out again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};
use crate::node::{width_of, Node};
use crate::position::{Position, RootName, GRAVEYARD};
use crate::range::Range;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Insert nodes at a position
    #[serde(rename_all = "camelCase")]
    Insert {
        position: Position,
        nodes: Vec<Node>,
        base_version: u64,
    },

    /// Move `how_many` offsets starting at `source` to `target`
    ///
    /// `target` is expressed in the tree as it was before the move. A sticky
    /// move carries positions touching its range boundaries along with it.
    #[serde(rename_all = "camelCase")]
    Move {
        source: Position,
        how_many: usize,
        target: Position,
        #[serde(default)]
        is_sticky: bool,
        base_version: u64,
    },

    /// Change an attribute on every node of a flat range
    #[serde(rename_all = "camelCase")]
    Attribute {
        range: Range,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
        base_version: u64,
    },

    #[serde(rename_all = "camelCase")]
    RootAttribute {
        root: RootName,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
        base_version: u64,
    },

    /// Rename the element starting at `position`
    #[serde(rename_all = "camelCase")]
    Rename {
        position: Position,
        old_name: String,
        new_name: String,
        base_version: u64,
    },

    /// Set, change or remove a named marker
    #[serde(rename_all = "camelCase")]
    Marker {
        name: String,
        old_range: Option<Range>,
        new_range: Option<Range>,
        base_version: u64,
    },

    #[serde(rename_all = "camelCase")]
    NoOp { base_version: u64 },
}

impl Operation {
    pub fn base_version(&self) -> u64 {
        match self {
            Operation::Insert { base_version, .. }
            | Operation::Move { base_version, .. }
            | Operation::Attribute { base_version, .. }
            | Operation::RootAttribute { base_version, .. }
            | Operation::Rename { base_version, .. }
            | Operation::Marker { base_version, .. }
            | Operation::NoOp { base_version } => *base_version,
        }
    }

    pub fn set_base_version(&mut self, version: u64) {
        match self {
            Operation::Insert { base_version, .. }
            | Operation::Move { base_version, .. }
            | Operation::Attribute { base_version, .. }
            | Operation::RootAttribute { base_version, .. }
            | Operation::Rename { base_version, .. }
            | Operation::Marker { base_version, .. }
            | Operation::NoOp { base_version } => *base_version = version,
        }
    }

    pub fn with_base_version(mut self, version: u64) -> Self {
        self.set_base_version(version);
        self
    }

    /// Short name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Move { .. } if self.is_remove() => "remove",
            Operation::Move { .. } if self.is_reinsert() => "reinsert",
            Operation::Move { .. } => "move",
            Operation::Attribute { .. } => "attribute",
            Operation::RootAttribute { .. } => "rootAttribute",
            Operation::Rename { .. } => "rename",
            Operation::Marker { .. } => "marker",
            Operation::NoOp { .. } => "noop",
        }
    }

    pub fn is_sticky(&self) -> bool {
        matches!(self, Operation::Move { is_sticky: true, .. })
    }

    pub(crate) fn set_sticky(&mut self, sticky: bool) {
        if let Operation::Move { is_sticky, .. } = self {
            *is_sticky = sticky;
        }
    }

    /// A move into the graveyard.
    pub fn is_remove(&self) -> bool {
        matches!(self, Operation::Move { target, .. } if target.root() == GRAVEYARD)
    }

    /// A move out of the graveyard.
    pub fn is_reinsert(&self) -> bool {
        matches!(self, Operation::Move { source, target, .. }
            if source.root() == GRAVEYARD && target.root() != GRAVEYARD)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Operation::NoOp { .. })
    }

    /// A move that leaves the tree as it is: it moves nothing, or its target
    /// touches the moved range.
    pub fn is_identity_move(&self) -> bool {
        match self {
            Operation::Move {
                source,
                how_many,
                target,
                ..
            } => {
                *how_many == 0
                    || (target.has_same_parent_as(source)
                        && (target.offset() == source.offset()
                            || target.offset() == source.offset() + how_many))
            }
            _ => false,
        }
    }

    /// The operation that undoes this one, valid right after this one was
    /// applied.
    pub fn reversed(&self) -> Operation {
        let base_version = self.base_version() + 1;
        match self {
            Operation::Insert {
                position, nodes, ..
            } => Operation::Move {
                source: position.clone(),
                how_many: width_of(nodes),
                target: Position::graveyard_start(),
                is_sticky: false,
                base_version,
            },
            Operation::Move {
                source,
                how_many,
                target,
                ..
            } => {
                let moved_start = target
                    .transformed_by_deletion(source, *how_many)
                    .unwrap_or_else(|| target.clone());
                let back = source.transformed_by_insertion(&moved_start, *how_many, false);
                Operation::Move {
                    source: moved_start,
                    how_many: *how_many,
                    target: back,
                    is_sticky: false,
                    base_version,
                }
            }
            Operation::Attribute {
                range,
                key,
                old_value,
                new_value,
                ..
            } => Operation::Attribute {
                range: range.clone(),
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
                base_version,
            },
            Operation::RootAttribute {
                root,
                key,
                old_value,
                new_value,
                ..
            } => Operation::RootAttribute {
                root: root.clone(),
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
                base_version,
            },
            Operation::Rename {
                position,
                old_name,
                new_name,
                ..
            } => Operation::Rename {
                position: position.clone(),
                old_name: new_name.clone(),
                new_name: old_name.clone(),
                base_version,
            },
            Operation::Marker {
                name,
                old_range,
                new_range,
                ..
            } => Operation::Marker {
                name: name.clone(),
                old_range: new_range.clone(),
                new_range: old_range.clone(),
                base_version,
            },
            Operation::NoOp { .. } => Operation::NoOp { base_version },
        }
    }

    /// Check the operation against the current tree without changing it.
    pub fn validate(&self, document: &Document) -> ModelResult<()> {
        match self {
            Operation::Insert { position, .. } => {
                check_offset(document, position, 0)?;
            }
            Operation::Move {
                source,
                how_many,
                target,
                ..
            } => {
                check_offset(document, source, *how_many)?;
                check_offset(document, target, 0)?;
                if target.is_inside(source, *how_many) {
                    return Err(ModelError::invalid_location(
                        target.root(),
                        target.path(),
                        "move target lies inside the moved range",
                    ));
                }
            }
            Operation::Attribute {
                range,
                key,
                old_value,
                ..
            } => {
                if !range.is_flat() {
                    return Err(ModelError::invalid_location(
                        range.root(),
                        range.start.path(),
                        "attribute range must be flat",
                    ));
                }
                check_offset(document, &range.start, range.how_many())?;
                let parent = document.element_at(range.root(), range.start.parent_path())?;
                for node in parent.nodes_in(range.start.offset(), range.how_many()) {
                    let found = node.attribute(key);
                    if found != old_value.as_ref() {
                        return Err(ModelError::AttributeMismatch {
                            key: key.clone(),
                            expected: describe(old_value.as_ref()),
                            found: describe(found),
                        });
                    }
                }
            }
            Operation::RootAttribute {
                root,
                key,
                old_value,
                ..
            } => {
                let found = document.root(root)?.attributes.get(key);
                if found != old_value.as_ref() {
                    return Err(ModelError::AttributeMismatch {
                        key: key.clone(),
                        expected: describe(old_value.as_ref()),
                        found: describe(found),
                    });
                }
            }
            Operation::Rename {
                position, old_name, ..
            } => {
                let element = document.element_at(position.root(), position.path())?;
                if &element.name != old_name {
                    return Err(ModelError::NameMismatch {
                        expected: old_name.clone(),
                        found: element.name.clone(),
                    });
                }
            }
            Operation::Marker {
                name,
                old_range,
                new_range,
                ..
            } => {
                if document.marker(name) != old_range.as_ref() {
                    return Err(ModelError::MarkerMismatch { name: name.clone() });
                }
                if let Some(range) = new_range {
                    document.root(range.root())?;
                }
            }
            Operation::NoOp { .. } => {}
        }
        Ok(())
    }

    /// Validate, then change the tree and the stored markers. Versions and
    /// history are the document's business.
    pub(crate) fn execute(&self, document: &mut Document) -> ModelResult<()> {
        self.validate(document)?;
        if self.is_identity_move() {
            return Ok(());
        }
        match self {
            Operation::Insert {
                position, nodes, ..
            } => {
                document
                    .element_at_mut(position.root(), position.parent_path())?
                    .insert_nodes(position.offset(), nodes.clone());
                let width = width_of(nodes);
                document.transform_markers(|range| range.marker_by_insertion(position, width));
            }
            Operation::Move {
                source,
                how_many,
                target,
                ..
            } => {
                let moved = document
                    .element_at_mut(source.root(), source.parent_path())?
                    .remove_nodes(source.offset(), *how_many);
                let target_after = target
                    .transformed_by_deletion(source, *how_many)
                    .unwrap_or_else(|| target.clone());
                document
                    .element_at_mut(target_after.root(), target_after.parent_path())?
                    .insert_nodes(target_after.offset(), moved);
                document
                    .transform_markers(|range| range.marker_by_move(source, target, *how_many));
            }
            Operation::Attribute {
                range,
                key,
                new_value,
                ..
            } => {
                document
                    .element_at_mut(range.root(), range.start.parent_path())?
                    .set_attribute_in(range.start.offset(), range.how_many(), key, new_value.as_ref());
            }
            Operation::RootAttribute {
                root,
                key,
                new_value,
                ..
            } => {
                let attributes = &mut document.root_mut(root)?.attributes;
                match new_value {
                    Some(value) => {
                        attributes.insert(key.clone(), value.clone());
                    }
                    None => {
                        attributes.remove(key);
                    }
                }
            }
            Operation::Rename {
                position, new_name, ..
            } => {
                document
                    .element_at_mut(position.root(), position.path())?
                    .name = new_name.clone();
            }
            Operation::Marker {
                name, new_range, ..
            } => document.set_marker_range(name, new_range.clone()),
            Operation::NoOp { .. } => {}
        }
        Ok(())
    }
}

/// `position` plus `how_many` following offsets must fit in an existing
/// element.
fn check_offset(document: &Document, position: &Position, how_many: usize) -> ModelResult<()> {
    let parent = document.element_at(position.root(), position.parent_path())?;
    if position.offset() + how_many > parent.max_offset() {
        return Err(ModelError::invalid_location(
            position.root(),
            position.path(),
            format!(
                "{} offsets from here exceed parent width {}",
                how_many,
                parent.max_offset()
            ),
        ));
    }
    Ok(())
}

fn describe(value: Option<&Value>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "<unset>".to_string())
}
