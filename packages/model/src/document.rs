//! # Document
//!
//! The document owns the roots, the markers and the operation history, and
//! is the only place where operations are applied.
//!
//! ## Versioning
//!
//! ```text
//! version:   0 ──op──▶ 1 ──op──▶ 2 ──op──▶ 3
//! history:   [op@0,     op@1,     op@2]
//! ```
//!
//! Each applied operation must carry the current version as its base version
//! and bumps the version by one. The history keeps every applied operation
//! (or the most recent `history_limit` of them) so that deltas created
//! against an older version can be transformed before they are applied.
//!
//! ## Reverting
//!
//! `revert` undoes a run of deltas. Operations applied since then that were
//! themselves reverted are taken out of the way together with their
//! reversal, so undoing several batches in a row is exact:
//!
//! ```text
//! history:  [b1] [b2] [b2⁻¹]       revert(b1) sees nothing after b1
//! ```

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::batch::{BatchBuilder, BatchId, BatchType};
use crate::delta::{Delta, DeltaKind};
use crate::errors::{ModelError, ModelResult};
use crate::node::{width_of, Element};
use crate::operation::Operation;
use crate::position::{Position, RootName, GRAVEYARD};
use crate::range::Range;
use crate::transform::{transform_sequences, SessionId, TaggedOperation, TieBreak};

/// An applied operation together with the tie-break of its delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub operation: Operation,
    pub tie_break: TieBreak,
    /// Version of the operation this one exactly undoes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverts: Option<u64>,
}

impl HistoryEntry {
    fn new(operation: Operation, tie_break: TieBreak) -> Self {
        Self {
            operation,
            tie_break,
            reverts: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    /// Number of history entries to retain (`None` = unlimited)
    pub history_limit: Option<usize>,

    /// Session of local edits
    pub session: SessionId,
}

/// Serializable state of a document, without its history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub version: u64,
    pub roots: BTreeMap<RootName, Element>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub markers: BTreeMap<String, Range>,
}

#[derive(Debug)]
pub struct Document {
    /// Current version number (increments on each applied operation)
    version: u64,

    roots: BTreeMap<RootName, Element>,

    markers: BTreeMap<String, Range>,

    history: VecDeque<HistoryEntry>,

    /// Version of the oldest retained history entry
    history_start: u64,

    options: DocumentOptions,

    next_batch_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    pub fn with_options(options: DocumentOptions) -> Self {
        let mut roots = BTreeMap::new();
        roots.insert(GRAVEYARD.to_string(), Element::new(GRAVEYARD));
        Self {
            version: 0,
            roots,
            markers: BTreeMap::new(),
            history: VecDeque::new(),
            history_start: 0,
            options,
            next_batch_id: 0,
        }
    }

    /// Start from a snapshot; history begins at the snapshot's version. The
    /// graveyard always starts empty, so a snapshot may not name it.
    pub fn from_snapshot(
        snapshot: DocumentSnapshot,
        options: DocumentOptions,
    ) -> ModelResult<Self> {
        if snapshot.roots.contains_key(GRAVEYARD) {
            return Err(ModelError::DuplicateRoot(GRAVEYARD.to_string()));
        }
        let mut document = Self::with_options(options);
        document.roots.extend(snapshot.roots);
        document.markers = snapshot.markers;
        document.version = snapshot.version;
        document.history_start = snapshot.version;
        Ok(document)
    }

    /// Roots (without the graveyard), markers and version.
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            version: self.version,
            roots: self
                .roots
                .iter()
                .filter(|(name, _)| name.as_str() != GRAVEYARD)
                .map(|(name, root)| (name.clone(), root.clone()))
                .collect(),
            markers: self.markers.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn session(&self) -> SessionId {
        self.options.session
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn create_root(&mut self, name: &str, element_name: &str) -> ModelResult<&Element> {
        if self.roots.contains_key(name) {
            return Err(ModelError::DuplicateRoot(name.to_string()));
        }
        debug!(root = name, element = element_name, "creating root");
        Ok(self
            .roots
            .entry(name.to_string())
            .or_insert_with(|| Element::new(element_name)))
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots
            .keys()
            .map(String::as_str)
            .filter(|name| *name != GRAVEYARD)
    }

    pub fn root(&self, name: &str) -> ModelResult<&Element> {
        self.roots
            .get(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    pub(crate) fn root_mut(&mut self, name: &str) -> ModelResult<&mut Element> {
        self.roots
            .get_mut(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    /// Removed content, most recently removed first.
    pub fn graveyard(&self) -> ModelResult<&Element> {
        self.root(GRAVEYARD)
    }

    /// The element reached by walking `path` from root `root`; every offset
    /// must be the exact start of a child element.
    pub fn element_at(&self, root: &str, path: &[usize]) -> ModelResult<&Element> {
        let mut element = self.root(root)?;
        for (depth, offset) in path.iter().enumerate() {
            element = element.element_at_offset(*offset).ok_or_else(|| {
                ModelError::invalid_location(root, &path[..=depth], "no element starts here")
            })?;
        }
        Ok(element)
    }

    pub(crate) fn element_at_mut(&mut self, root: &str, path: &[usize]) -> ModelResult<&mut Element> {
        let mut element = self.root_mut(root)?;
        for (depth, offset) in path.iter().enumerate() {
            element = element.element_at_offset_mut(*offset).ok_or_else(|| {
                ModelError::invalid_location(root, &path[..=depth], "no element starts here")
            })?;
        }
        Ok(element)
    }

    pub fn marker(&self, name: &str) -> Option<&Range> {
        self.markers.get(name)
    }

    pub fn markers(&self) -> &BTreeMap<String, Range> {
        &self.markers
    }

    pub(crate) fn set_marker_range(&mut self, name: &str, range: Option<Range>) {
        match range {
            Some(range) => {
                self.markers.insert(name.to_string(), range);
            }
            None => {
                self.markers.remove(name);
            }
        }
    }

    pub(crate) fn transform_markers(&mut self, transform: impl Fn(&Range) -> Range) {
        for range in self.markers.values_mut() {
            *range = transform(range);
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Version of the oldest operation still in the history.
    pub fn history_start(&self) -> u64 {
        self.history_start
    }

    /// Apply a single operation as a local edit.
    pub fn apply_operation(&mut self, operation: &Operation) -> ModelResult<()> {
        let tie_break = TieBreak::new(0, self.options.session);
        self.check_version(operation.base_version())?;
        operation.execute(self)?;
        self.record(HistoryEntry::new(operation.clone(), tie_break));
        Ok(())
    }

    /// Apply every operation of a local delta, or none of them.
    pub fn apply_delta(&mut self, delta: &Delta) -> ModelResult<()> {
        let tie_break = delta.tie_break(self.options.session);
        self.apply_delta_as(delta, tie_break)
    }

    #[instrument(skip(self, delta), fields(kind = %delta.kind(), ops = delta.operations().len()))]
    fn apply_delta_as(&mut self, delta: &Delta, tie_break: TieBreak) -> ModelResult<()> {
        let entries = delta
            .operations()
            .iter()
            .map(|operation| HistoryEntry::new(operation.clone(), tie_break))
            .collect();
        self.apply_entries(entries)?;
        debug!(version = self.version, "delta applied");
        Ok(())
    }

    /// Execute every operation in order and record them, or leave the
    /// document as it was.
    fn apply_entries(&mut self, entries: Vec<HistoryEntry>) -> ModelResult<()> {
        let markers = self.markers.clone();
        let mut applied: Vec<&Operation> = Vec::with_capacity(entries.len());

        for (entry, expected) in entries.iter().zip(self.version..) {
            let operation = &entry.operation;
            let result = if operation.base_version() != expected {
                Err(ModelError::VersionMismatch {
                    expected,
                    actual: operation.base_version(),
                })
            } else {
                operation.execute(self)
            };
            if let Err(err) = result {
                warn!(
                    error = %err,
                    failed = operation.kind_name(),
                    applied = applied.len(),
                    "delta failed, rolling back"
                );
                let rolled_back = self.rollback(&applied);
                self.markers = markers;
                if let Err(rollback_err) = rolled_back {
                    error!(error = %rollback_err, cause = %err, "rollback failed");
                    return Err(rollback_err);
                }
                return Err(err);
            }
            applied.push(operation);
        }

        for entry in entries {
            self.record(entry);
        }
        Ok(())
    }

    /// Structurally undo already executed operations, last first.
    fn rollback(&mut self, applied: &[&Operation]) -> ModelResult<()> {
        for operation in applied.iter().rev() {
            let result = match operation {
                Operation::Insert {
                    position, nodes, ..
                } => self
                    .element_at_mut(position.root(), position.parent_path())
                    .map(|parent| {
                        parent.remove_nodes(position.offset(), width_of(nodes));
                    }),
                other => other.reversed().execute(self),
            };
            result.map_err(|err| ModelError::RollbackFailed {
                operation: operation.kind_name(),
                source: Box::new(err),
            })?;
        }
        Ok(())
    }

    fn check_version(&self, base_version: u64) -> ModelResult<()> {
        if base_version != self.version {
            return Err(ModelError::VersionMismatch {
                expected: self.version,
                actual: base_version,
            });
        }
        Ok(())
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        self.version += 1;

        if let Some(limit) = self.options.history_limit {
            let mut evicted = 0;
            while self.history.len() > limit {
                self.history.pop_front();
                self.history_start += 1;
                evicted += 1;
            }
            if evicted > 0 {
                debug!(evicted, oldest = self.history_start, "history trimmed");
            }
        }
    }

    /// Rewrite a delta created against an older version so that it applies
    /// on top of the current one.
    pub fn transform_delta(&self, delta: Delta, session: SessionId) -> ModelResult<Delta> {
        let Some(base_version) = delta.base_version() else {
            return Ok(delta);
        };
        if base_version > self.version {
            return Err(ModelError::VersionMismatch {
                expected: self.version,
                actual: base_version,
            });
        }
        if base_version < self.history_start {
            return Err(ModelError::HistoryUnavailable {
                requested: base_version,
                oldest: self.history_start,
            });
        }

        let kind = delta.kind();
        let tie_break = delta.tie_break(session);
        let incoming = delta
            .into_operations()
            .into_iter()
            .map(|operation| TaggedOperation::new(operation, tie_break))
            .collect();
        let concurrent: Vec<TaggedOperation> = self
            .history
            .iter()
            .skip((base_version - self.history_start) as usize)
            .map(|entry| TaggedOperation::new(entry.operation.clone(), entry.tie_break))
            .collect();
        debug!(
            base_version,
            concurrent = concurrent.len(),
            "transforming incoming delta"
        );

        let (transformed, _) = transform_sequences(incoming, concurrent);
        let operations = transformed
            .into_iter()
            .map(|tagged| tagged.operation)
            .collect();
        Ok(Delta::new(kind, operations).with_base_version(self.version))
    }

    /// Transform a delta from `session` against everything applied since its
    /// base version, then apply it atomically. Returns the delta as applied.
    #[instrument(skip(self, delta, session), fields(kind = %delta.kind(), session = %session))]
    pub fn apply_remote(&mut self, delta: Delta, session: SessionId) -> ModelResult<Delta> {
        let transformed = self.transform_delta(delta, session)?;
        let tie_break = transformed.tie_break(session);
        self.apply_delta_as(&transformed, tie_break)?;
        info!(version = self.version, "remote delta applied");
        Ok(transformed)
    }

    /// Undo `deltas`, which were applied one right after another, on top of
    /// everything applied since. The reversal is applied atomically and
    /// returned as one delta per undone delta, the last one first.
    #[instrument(skip(self, deltas), fields(deltas = deltas.len()))]
    pub fn revert(&mut self, deltas: &[Delta]) -> ModelResult<Vec<Delta>> {
        let originals: Vec<&Operation> = deltas.iter().flat_map(|delta| delta.operations()).collect();
        let Some(first) = originals.first() else {
            return Ok(Vec::new());
        };
        let start = first.base_version();
        for (operation, expected) in originals.iter().zip(start..) {
            if operation.base_version() != expected {
                return Err(ModelError::VersionMismatch {
                    expected,
                    actual: operation.base_version(),
                });
            }
        }
        let end = start + originals.len() as u64;
        if end > self.version {
            return Err(ModelError::VersionMismatch {
                expected: self.version,
                actual: end,
            });
        }
        if start < self.history_start {
            return Err(ModelError::HistoryUnavailable {
                requested: start,
                oldest: self.history_start,
            });
        }

        // reversal of the whole run, valid right after its last operation
        let session = self.options.session;
        let mut leftovers: Vec<TaggedOperation> = Vec::new();
        let mut reversal: Vec<(DeltaKind, TieBreak, Vec<(Vec<TaggedOperation>, u64)>)> =
            Vec::with_capacity(deltas.len());
        for delta in deltas.iter().rev() {
            let reversed = delta.reversed();
            let kind = reversed.kind();
            let tie_break = reversed.tie_break(session);
            let mut steps = Vec::with_capacity(delta.operations().len());
            for (operation, original) in reversed
                .into_operations()
                .into_iter()
                .zip(delta.operations().iter().rev())
            {
                let (undo, rest) =
                    take_out(original, TaggedOperation::new(operation, tie_break), leftovers);
                leftovers = rest;
                steps.push((undo, original.base_version()));
            }
            reversal.push((kind, tie_break, steps));
        }

        let mut concurrent = self.history_since(end);
        debug!(start, end, concurrent = concurrent.len(), "reverting");

        let mut entries = Vec::new();
        let mut reverted = Vec::with_capacity(reversal.len());
        let mut version = self.version;
        for (kind, tie_break, steps) in reversal {
            let mut operations = Vec::new();
            for (undo, original_version) in steps {
                let exact = undo.len() == 1;
                let (undo, rest) = transform_sequences(undo, concurrent);
                concurrent = rest;
                let reverts = (exact && undo.len() == 1).then_some(original_version);
                for tagged in undo {
                    let operation = tagged.operation.with_base_version(version);
                    version += 1;
                    entries.push(HistoryEntry {
                        operation: operation.clone(),
                        tie_break,
                        reverts,
                    });
                    operations.push(operation);
                }
            }
            reverted.push(Delta::new(kind, operations));
        }

        self.apply_entries(entries)?;
        info!(version = self.version, "deltas reverted");
        Ok(reverted)
    }

    /// History applied since `version`, where every operation that a later
    /// one exactly undid is taken out together with its undoing.
    fn history_since(&self, version: u64) -> Vec<TaggedOperation> {
        let skip = version.saturating_sub(self.history_start) as usize;
        // operations with the version they were applied at; leftovers of
        // taken out insertions have none
        let mut kept: Vec<(TaggedOperation, Option<u64>)> = Vec::new();
        for (entry, applied_at) in self.history.iter().skip(skip).zip(version..) {
            let tagged = TaggedOperation::new(entry.operation.clone(), entry.tie_break);
            if let Some(reverted) = entry.reverts {
                if cancel(&mut kept, reverted, &tagged) {
                    continue;
                }
            }
            kept.push((tagged, Some(applied_at)));
        }
        kept.into_iter().map(|(tagged, _)| tagged).collect()
    }

    /// Start a batch of local changes.
    pub fn batch(&mut self) -> BatchBuilder<'_> {
        BatchBuilder::new(self, BatchType::Default)
    }

    /// Start a batch that the undo stack will not record.
    pub fn transparent_batch(&mut self) -> BatchBuilder<'_> {
        BatchBuilder::new(self, BatchType::Transparent)
    }

    pub(crate) fn next_batch_id(&mut self) -> BatchId {
        let id = BatchId(self.next_batch_id);
        self.next_batch_id += 1;
        id
    }
}

/// Take `original` out from under `leftovers`, graveyard insertions applied
/// after it. Returns its reversal as it applies after them, and the
/// leftovers as they apply without `original`. An undone insertion leaves its
/// nodes in the graveyard, which adds a leftover in front.
fn take_out(
    original: &Operation,
    reversal: TaggedOperation,
    leftovers: Vec<TaggedOperation>,
) -> (Vec<TaggedOperation>, Vec<TaggedOperation>) {
    let tie_break = reversal.tie_break;
    let (undo, mut rest) = transform_sequences(vec![reversal], leftovers);
    if let Operation::Insert { nodes, .. } = original {
        let left = Operation::Insert {
            position: Position::graveyard_start(),
            nodes: nodes.clone(),
            base_version: original.base_version(),
        };
        rest.insert(0, TaggedOperation::new(left, tie_break));
    }
    (undo, rest)
}

/// Drop the operation applied at `reverted` from `kept` when `reversal`
/// undoes exactly it. Only leftovers may sit on top of it.
fn cancel(
    kept: &mut Vec<(TaggedOperation, Option<u64>)>,
    reverted: u64,
    reversal: &TaggedOperation,
) -> bool {
    let Some(index) = kept.iter().rposition(|(_, version)| version.is_some()) else {
        return false;
    };
    if kept[index].1 != Some(reverted) {
        return false;
    }
    let original = kept[index].0.operation.clone();
    let mut expected = original.reversed();
    expected.set_sticky(reversal.operation.is_sticky());
    let leftovers = kept[index + 1..]
        .iter()
        .map(|(tagged, _)| tagged.clone())
        .collect();
    let (undo, rest) = take_out(
        &original,
        TaggedOperation::new(expected, reversal.tie_break),
        leftovers,
    );
    let exact = match undo.as_slice() {
        [undo] => same_change(&undo.operation, &reversal.operation),
        _ => false,
    };
    if !exact {
        return false;
    }
    kept.truncate(index);
    kept.extend(rest.into_iter().map(|tagged| (tagged, None)));
    true
}

fn same_change(a: &Operation, b: &Operation) -> bool {
    a.clone().with_base_version(0) == b.clone().with_base_version(0)
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::position::Position;

    fn document() -> Document {
        let mut document = Document::new();
        document.create_root("main", "root").unwrap();
        document
    }

    fn insert_text(document: &mut Document, offset: usize, text: &str) {
        let delta = Delta::insert(
            document,
            Position::in_root("main", offset),
            vec![Node::text(text)],
        );
        document.apply_delta(&delta).unwrap();
    }

    #[test]
    fn test_duplicate_root() {
        let mut document = document();
        let err = document.create_root("main", "root").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateRoot(_)));
        assert_eq!(document.root_names().collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn test_version_increments_per_operation() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        assert_eq!(document.version(), 1);
        assert_eq!(document.history().count(), 1);
    }

    #[test]
    fn test_stale_operation_rejected() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        let stale = Operation::Insert {
            position: Position::in_root("main", 0),
            nodes: vec![Node::text("x")],
            base_version: 0,
        };
        let err = document.apply_operation(&stale).unwrap_err();
        assert!(matches!(err, ModelError::VersionMismatch { expected: 1, actual: 0 }));
        assert_eq!(document.root("main").unwrap().text_content(), "abc");
    }

    #[test]
    fn test_failed_delta_rolls_back() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        let delta = Delta::new(
            crate::delta::DeltaKind::Insert,
            vec![
                Operation::Insert {
                    position: Position::in_root("main", 1),
                    nodes: vec![Node::text("xy")],
                    base_version: 1,
                },
                Operation::Insert {
                    position: Position::in_root("main", 99),
                    nodes: vec![Node::text("z")],
                    base_version: 2,
                },
            ],
        );
        assert!(document.apply_delta(&delta).is_err());
        assert_eq!(document.version(), 1);
        assert_eq!(document.root("main").unwrap().text_content(), "abc");
    }

    #[test]
    fn test_history_limit_evicts() {
        let mut document = Document::with_options(DocumentOptions {
            history_limit: Some(2),
            session: SessionId(1),
        });
        document.create_root("main", "root").unwrap();
        for _ in 0..4 {
            insert_text(&mut document, 0, "a");
        }
        assert_eq!(document.history().count(), 2);
        assert_eq!(document.history_start(), 2);

        let old = Delta::insert(&document, Position::in_root("main", 0), vec![Node::text("b")])
            .with_base_version(1);
        let err = document.apply_remote(old, SessionId(2)).unwrap_err();
        assert!(matches!(err, ModelError::HistoryUnavailable { requested: 1, oldest: 2 }));
        assert!(err.is_version_error());
    }

    #[test]
    fn test_future_delta_rejected() {
        let mut document = document();
        let future = Delta::insert(&document, Position::in_root("main", 0), vec![Node::text("b")])
            .with_base_version(5);
        let err = document.apply_remote(future, SessionId(2)).unwrap_err();
        assert!(matches!(err, ModelError::VersionMismatch { expected: 0, actual: 5 }));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut document = document();
        insert_text(&mut document, 0, "hello");
        let snapshot = document.snapshot();
        assert!(!snapshot.roots.contains_key(GRAVEYARD));

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored = Document::from_snapshot(
            serde_json::from_str(&json).unwrap(),
            DocumentOptions::default(),
        )
        .unwrap();
        assert_eq!(restored.version(), 1);
        assert_eq!(restored.history_start(), 1);
        assert_eq!(restored.root("main").unwrap().text_content(), "hello");
        assert!(restored.graveyard().is_ok());
    }

    #[test]
    fn test_snapshot_naming_graveyard_rejected() {
        let mut snapshot = document().snapshot();
        snapshot
            .roots
            .insert(GRAVEYARD.to_string(), Element::new("root").with_children(vec![Node::text("x")]));
        let err = Document::from_snapshot(snapshot, DocumentOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateRoot(name) if name == GRAVEYARD));
    }

    #[test]
    fn test_rollback_failure_is_reported() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        // nothing at offset 7 to move back
        let moved = Operation::Move {
            source: Position::in_root("main", 0),
            how_many: 2,
            target: Position::in_root("main", 7),
            is_sticky: false,
            base_version: 1,
        };
        let err = document.rollback(&[&moved]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::RollbackFailed { operation: "move", .. }
        ));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_revert_rejects_gap_between_deltas() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        insert_text(&mut document, 0, "x");
        insert_text(&mut document, 0, "y");
        let deltas: Vec<Delta> = document
            .history()
            .enumerate()
            .filter(|(index, _)| *index != 1)
            .map(|(_, entry)| Delta::new(DeltaKind::Insert, vec![entry.operation.clone()]))
            .collect();
        let err = document.revert(&deltas).unwrap_err();
        assert!(matches!(err, ModelError::VersionMismatch { expected: 1, actual: 2 }));
        assert_eq!(document.version(), 3);
    }

    #[test]
    fn test_revert_tags_exact_reversals() {
        let mut document = document();
        insert_text(&mut document, 0, "abc");
        let delta = Delta::insert(&document, Position::in_root("main", 3), vec![Node::text("!")]);
        document.apply_delta(&delta).unwrap();

        let reverted = document.revert(std::slice::from_ref(&delta)).unwrap();
        assert_eq!(reverted.len(), 1);
        assert_eq!(reverted[0].kind(), DeltaKind::Remove);
        assert_eq!(document.root("main").unwrap().text_content(), "abc");
        let last = document.history().last().unwrap();
        assert_eq!(last.reverts, Some(1));
        // the insertion and its undoing cancel out, leaving "!" in the graveyard
        let since = document.history_since(1);
        assert_eq!(since.len(), 1);
        assert!(matches!(
            &since[0].operation,
            Operation::Insert { position, .. } if position.root() == GRAVEYARD
        ));
    }
}
