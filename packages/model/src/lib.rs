//! # Scribe Model
//!
//! Versioned rich-text document model driven by invertible, transformable
//! operations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ position / range: pure tree addressing      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ operation: insert, move, attribute, ...     │
//! │ transform: rebase an op on a concurrent one │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ delta: ops with one meaning (split, wrap)   │
//! │ batch: deltas of one user action            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: roots, markers, history           │
//! │ undo stack: reversal through the history    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Versioned**: every operation names the version it applies to
//! 2. **Invertible**: every operation and delta can be reversed
//! 3. **Nothing is deleted**: removed content moves to the graveyard root
//! 4. **Atomic deltas**: a delta applies completely or not at all
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_model::{Document, Position, UndoStack};
//!
//! let mut document = Document::new();
//! document.create_root("main", "root")?;
//!
//! let mut undo = UndoStack::new();
//! let batch = document
//!     .batch()
//!     .insert(Position::in_root("main", 0), vec![paragraph])?
//!     .split(&Position::new("main", vec![0, 2])?)?
//!     .commit();
//! undo.record(batch);
//!
//! // a peer's delta, created against an older version
//! document.apply_remote(remote_delta, SessionId(2))?;
//!
//! undo.undo(&mut document)?;
//! ```

mod batch;
mod delta;
mod document;
mod errors;
mod node;
mod operation;
mod position;
mod processor;
mod range;
mod registry;
mod transform;
mod undo_stack;

pub use batch::{Batch, BatchBuilder, BatchId, BatchType};
pub use delta::{Delta, DeltaKind, SerializedDelta};
pub use document::{Document, DocumentOptions, DocumentSnapshot, HistoryEntry};
pub use errors::{ModelError, ModelResult};
pub use node::{width_of, Attributes, Element, Node, Text};
pub use operation::Operation;
pub use position::{Position, RootName, GRAVEYARD};
pub use processor::{DataProcessor, JsonDataProcessor};
pub use range::Range;
pub use registry::DeltaFactory;
pub use transform::{is_stronger, transform, transform_sequences, SessionId, TaggedOperation, TieBreak};
pub use undo_stack::UndoStack;
