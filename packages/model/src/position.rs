//! # Positions
//!
//! A position addresses a gap between two nodes (or two characters) in the
//! tree: a root name plus a path of offsets. Every component but the last
//! selects an element by its offset inside the parent, the last component is
//! the offset inside the innermost element.
//!
//! Positions are values. They are never updated in place: whenever the tree
//! changes, callers recompute them with the `transformed_by_*` family.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::errors::{ModelError, ModelResult};

/// Name of a document root.
pub type RootName = String;

/// Root holding removed content.
pub const GRAVEYARD: &str = "$graveyard";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PositionRepr")]
pub struct Position {
    root: RootName,
    path: Vec<usize>,
}

#[derive(Deserialize)]
struct PositionRepr {
    root: RootName,
    path: Vec<usize>,
}

impl TryFrom<PositionRepr> for Position {
    type Error = ModelError;

    fn try_from(repr: PositionRepr) -> Result<Self, Self::Error> {
        Position::new(repr.root, repr.path)
    }
}

impl Position {
    /// Create a position; the path must address at least one level.
    pub fn new(root: impl Into<RootName>, path: Vec<usize>) -> ModelResult<Self> {
        let root = root.into();
        if path.is_empty() {
            return Err(ModelError::invalid_location(root, &path, "empty path"));
        }
        Ok(Self { root, path })
    }

    /// Position at `offset` directly inside root `root`.
    pub fn in_root(root: impl Into<RootName>, offset: usize) -> Self {
        Self {
            root: root.into(),
            path: vec![offset],
        }
    }

    /// Start of the graveyard, where removed content is parked.
    pub fn graveyard_start() -> Self {
        Self::in_root(GRAVEYARD, 0)
    }

    /// Create a position checked against the current tree: `parent_path`
    /// must address an element and `offset` must not exceed its width.
    pub fn from_parent_and_offset(
        document: &Document,
        root: &str,
        parent_path: &[usize],
        offset: usize,
    ) -> ModelResult<Self> {
        let parent = document.element_at(root, parent_path)?;
        let mut path = parent_path.to_vec();
        path.push(offset);
        if offset > parent.max_offset() {
            return Err(ModelError::invalid_location(
                root,
                &path,
                format!("offset exceeds parent width {}", parent.max_offset()),
            ));
        }
        Ok(Self {
            root: root.to_string(),
            path,
        })
    }

    /// Position right after the node that starts at `node`.
    pub fn after(document: &Document, node: &Position) -> ModelResult<Self> {
        let parent = document.element_at(&node.root, node.parent_path())?;
        let width = parent
            .node_starting_at(node.offset())
            .map(|n| n.width())
            .ok_or_else(|| {
                ModelError::invalid_location(&node.root, &node.path, "no node starts here")
            })?;
        Ok(node.with_offset(node.offset() + width))
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Offset inside the parent element.
    pub fn offset(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    /// Path of the parent element (empty when the parent is the root).
    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    /// Position of the parent element inside its own parent, `None` when the
    /// parent is a root.
    pub fn parent_position(&self) -> Option<Position> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            root: self.root.clone(),
            path: self.parent_path().to_vec(),
        })
    }

    /// Position `offset` inside the element that starts at this position.
    pub fn descend(&self, offset: usize) -> Position {
        let mut path = self.path.clone();
        path.push(offset);
        Self {
            root: self.root.clone(),
            path,
        }
    }

    pub fn with_offset(&self, offset: usize) -> Position {
        let mut path = self.path.clone();
        let last = path.len() - 1;
        path[last] = offset;
        Self {
            root: self.root.clone(),
            path,
        }
    }

    /// Position moved by `shift` inside the same parent.
    pub fn shifted_by(&self, shift: isize) -> ModelResult<Position> {
        let offset = self.offset() as isize + shift;
        if offset < 0 {
            return Err(ModelError::invalid_location(
                &self.root,
                &self.path,
                format!("cannot shift by {shift}"),
            ));
        }
        Ok(self.with_offset(offset as usize))
    }

    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.root == other.root && self.parent_path() == other.parent_path()
    }

    pub fn compare(&self, other: &Position) -> ModelResult<Ordering> {
        if self.root != other.root {
            return Err(ModelError::DifferentRoots {
                left: self.root.clone(),
                right: other.root.clone(),
            });
        }
        Ok(self.path.cmp(&other.path))
    }

    pub fn is_before(&self, other: &Position) -> ModelResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn is_after(&self, other: &Position) -> ModelResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn is_equal(&self, other: &Position) -> ModelResult<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    /// True when `at` sits at this position's level or on one of its
    /// ancestors' levels, i.e. a change at `at` can shift this position.
    fn level_of(&self, at: &Position) -> Option<usize> {
        if self.root != at.root || self.path.len() < at.path.len() {
            return None;
        }
        let i = at.path.len() - 1;
        (self.path[..i] == at.path[..i]).then_some(i)
    }

    /// This position after `how_many` offsets were inserted at `at`.
    ///
    /// When the insertion lands exactly here, `insert_before` decides whether
    /// the new content ends up before this position.
    pub fn transformed_by_insertion(
        &self,
        at: &Position,
        how_many: usize,
        insert_before: bool,
    ) -> Position {
        let mut transformed = self.clone();
        let Some(i) = self.level_of(at) else {
            return transformed;
        };
        let same_parent = self.path.len() == at.path.len();
        let ours = self.path[i];
        if at.offset() < ours || (at.offset() == ours && (insert_before || !same_parent)) {
            transformed.path[i] += how_many;
        }
        transformed
    }

    /// This position after `how_many` offsets were taken out at `at`; `None`
    /// when the position was inside the removed content.
    pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Option<Position> {
        let mut transformed = self.clone();
        let Some(i) = self.level_of(at) else {
            return Some(transformed);
        };
        let same_parent = self.path.len() == at.path.len();
        let ours = self.path[i];
        let start = at.offset();
        if start < ours || (start == ours && !same_parent) {
            if start + how_many > ours {
                return None;
            }
            transformed.path[i] -= how_many;
        }
        Some(transformed)
    }

    /// This position after the move of `how_many` offsets from `source` to
    /// `target` (target expressed before the move).
    ///
    /// Positions inside the moved content travel with it. A sticky move also
    /// carries the positions touching the moved range's boundaries.
    pub fn transformed_by_move(
        &self,
        source: &Position,
        target: &Position,
        how_many: usize,
        insert_before: bool,
        sticky: bool,
    ) -> Position {
        let target_after = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());
        if sticky
            && self.has_same_parent_as(source)
            && (self.offset() == source.offset() || self.offset() == source.offset() + how_many)
        {
            return self.combined(source, &target_after);
        }
        match self.transformed_by_deletion(source, how_many) {
            Some(position) => {
                position.transformed_by_insertion(&target_after, how_many, insert_before)
            }
            None => self.combined(source, &target_after),
        }
    }

    /// Re-anchor a position that lies in content starting at `source` so that
    /// the same content starts at `target`.
    pub(crate) fn combined(&self, source: &Position, target: &Position) -> Position {
        let i = source.path.len() - 1;
        let mut path = target.path.clone();
        let last = path.len() - 1;
        path[last] = target.offset() + self.path[i] - source.offset();
        path.extend_from_slice(&self.path[i + 1..]);
        Position {
            root: target.root.clone(),
            path,
        }
    }

    /// True when this position lies strictly inside the `how_many` offsets
    /// starting at `start` (deeper positions inside the covered nodes count).
    pub(crate) fn is_inside(&self, start: &Position, how_many: usize) -> bool {
        self.transformed_by_deletion(start, how_many).is_none()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.root, self.path)
    }
}
