//! # Batches
//!
//! A batch groups the deltas of one user action so that they are undone and
//! redone together.
//!
//! ```rust,ignore
//! let batch = document
//!     .batch()
//!     .insert_text(Position::new("main", vec![0, 0])?, "Hello")?
//!     .split(&Position::new("main", vec![0, 2])?)?
//!     .commit();
//! undo_stack.record(batch);
//! ```
//!
//! Every builder method builds one delta against the current document,
//! applies it atomically and appends it to the batch.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::delta::Delta;
use crate::document::Document;
use crate::errors::ModelResult;
use crate::node::{Attributes, Element, Node, Text};
use crate::position::Position;
use crate::range::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchType {
    #[default]
    Default,
    /// Not recorded by the undo stack
    Transparent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    #[serde(skip)]
    pub id: BatchId,
    #[serde(skip)]
    pub batch_type: BatchType,
    pub deltas: Vec<Delta>,
}

impl Batch {
    pub fn new(id: BatchId, batch_type: BatchType) -> Self {
        Self {
            id,
            batch_type,
            deltas: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn is_transparent(&self) -> bool {
        self.batch_type == BatchType::Transparent
    }

    /// Base version of the first delta.
    pub fn base_version(&self) -> Option<u64> {
        self.deltas.first().and_then(Delta::base_version)
    }
}

#[derive(Debug)]
pub struct BatchBuilder<'a> {
    document: &'a mut Document,
    batch: Batch,
}

impl<'a> BatchBuilder<'a> {
    pub(crate) fn new(document: &'a mut Document, batch_type: BatchType) -> Self {
        let id = document.next_batch_id();
        Self {
            document,
            batch: Batch::new(id, batch_type),
        }
    }

    /// The document as changed by the deltas so far.
    pub fn document(&self) -> &Document {
        self.document
    }

    fn push(&mut self, delta: Delta) -> ModelResult<&mut Self> {
        self.document.apply_delta(&delta)?;
        debug!(batch = self.batch.id.0, kind = %delta.kind(), "delta added to batch");
        self.batch.deltas.push(delta);
        Ok(self)
    }

    pub fn insert(&mut self, position: Position, nodes: Vec<Node>) -> ModelResult<&mut Self> {
        let delta = Delta::insert(self.document, position, nodes);
        self.push(delta)
    }

    pub fn insert_text(&mut self, position: Position, text: &str) -> ModelResult<&mut Self> {
        self.insert(position, vec![Node::text(text)])
    }

    pub fn insert_text_with(
        &mut self,
        position: Position,
        text: &str,
        attributes: Attributes,
    ) -> ModelResult<&mut Self> {
        let mut text = Text::new(text);
        text.attributes = attributes;
        self.insert(position, vec![Node::Text(text)])
    }

    pub fn remove(&mut self, range: &Range) -> ModelResult<&mut Self> {
        let delta = Delta::remove(self.document, range)?;
        self.push(delta)
    }

    pub fn move_range(&mut self, range: &Range, target: Position) -> ModelResult<&mut Self> {
        let delta = Delta::move_range(self.document, range, target)?;
        self.push(delta)
    }

    pub fn set_attribute(
        &mut self,
        range: &Range,
        key: &str,
        value: Value,
    ) -> ModelResult<&mut Self> {
        self.change_attribute(range, key, Some(value))
    }

    pub fn remove_attribute(&mut self, range: &Range, key: &str) -> ModelResult<&mut Self> {
        self.change_attribute(range, key, None)
    }

    fn change_attribute(
        &mut self,
        range: &Range,
        key: &str,
        value: Option<Value>,
    ) -> ModelResult<&mut Self> {
        match Delta::attribute(self.document, range, key, value)? {
            Some(delta) => self.push(delta),
            None => Ok(self),
        }
    }

    pub fn set_root_attribute(
        &mut self,
        root: &str,
        key: &str,
        value: Value,
    ) -> ModelResult<&mut Self> {
        let delta = Delta::root_attribute(self.document, root, key, Some(value))?;
        self.push(delta)
    }

    pub fn remove_root_attribute(&mut self, root: &str, key: &str) -> ModelResult<&mut Self> {
        let delta = Delta::root_attribute(self.document, root, key, None)?;
        self.push(delta)
    }

    pub fn rename(&mut self, position: Position, new_name: &str) -> ModelResult<&mut Self> {
        let delta = Delta::rename(self.document, position, new_name)?;
        self.push(delta)
    }

    pub fn split(&mut self, position: &Position) -> ModelResult<&mut Self> {
        let delta = Delta::split(self.document, position)?;
        self.push(delta)
    }

    pub fn merge(&mut self, position: &Position) -> ModelResult<&mut Self> {
        let delta = Delta::merge(self.document, position)?;
        self.push(delta)
    }

    pub fn wrap(&mut self, range: &Range, element: Element) -> ModelResult<&mut Self> {
        let delta = Delta::wrap(self.document, range, element)?;
        self.push(delta)
    }

    pub fn unwrap(&mut self, position: &Position) -> ModelResult<&mut Self> {
        let delta = Delta::unwrap(self.document, position)?;
        self.push(delta)
    }

    pub fn set_marker(&mut self, name: &str, range: Range) -> ModelResult<&mut Self> {
        let delta = Delta::marker(self.document, name, Some(range))?;
        self.push(delta)
    }

    pub fn remove_marker(&mut self, name: &str) -> ModelResult<&mut Self> {
        let delta = Delta::marker(self.document, name, None)?;
        self.push(delta)
    }

    /// Finish the batch.
    pub fn commit(&mut self) -> Batch {
        let id = self.batch.id;
        let batch_type = self.batch.batch_type;
        std::mem::replace(&mut self.batch, Batch::new(id, batch_type))
    }
}
