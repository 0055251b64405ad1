//! # Undo/Redo Stack
//!
//! Tracks committed batches and undoes or redoes them.
//!
//! ## Design
//!
//! - Undo reverses a batch as a whole, last delta first, and applies the
//!   reversal atomically
//! - The reversal is transformed against everything applied since the batch,
//!   so undo works after concurrent (remote) edits; batches undone in
//!   between do not get in the way
//! - The applied reversal is kept on the redo stack; redo reverses it again
//! - Recording a new batch clears the redo stack
//! - Transparent batches are never recorded
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let batch = document.batch().insert_text(position, "Hello")?.commit();
//! stack.record(batch);
//!
//! stack.undo(&mut document)?;
//! stack.redo(&mut document)?;
//! ```

use tracing::{debug, info};

use crate::batch::{Batch, BatchType};
use crate::document::Document;
use crate::errors::ModelResult;

#[derive(Debug)]
pub struct UndoStack {
    /// Batches that can be undone (most recent last)
    undo_stack: Vec<Batch>,

    /// Applied reversals that can be redone (most recent last)
    redo_stack: Vec<Batch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record a committed batch. Returns false when the batch is skipped.
    pub fn record(&mut self, batch: Batch) -> bool {
        if batch.is_transparent() || batch.is_empty() {
            return false;
        }
        self.undo_stack.push(batch);
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        true
    }

    /// Undo the most recent batch.
    pub fn undo(&mut self, document: &mut Document) -> ModelResult<bool> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(false);
        };
        match revert(&batch, document) {
            Ok(reverted) => {
                info!(batch = batch.id.0, "undo");
                self.redo_stack.push(reverted);
                Ok(true)
            }
            Err(err) => {
                self.undo_stack.push(batch);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone batch.
    pub fn redo(&mut self, document: &mut Document) -> ModelResult<bool> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(false);
        };
        match revert(&batch, document) {
            Ok(reverted) => {
                info!(batch = batch.id.0, "redo");
                self.undo_stack.push(reverted);
                Ok(true)
            }
            Err(err) => {
                self.redo_stack.push(batch);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the reversal of `batch`. Returns the applied deltas as a batch with
/// the same id.
fn revert(batch: &Batch, document: &mut Document) -> ModelResult<Batch> {
    let mut reverted = Batch::new(batch.id, BatchType::Default);
    reverted.deltas = document.revert(&batch.deltas)?;
    debug!(
        batch = batch.id.0,
        deltas = reverted.deltas.len(),
        version = document.version(),
        "batch reverted"
    );
    Ok(reverted)
}
