//! # Delta Registry
//!
//! Maps wire tags to delta kinds so serialized deltas can be rebuilt. The
//! built-in kinds are registered under their own tags; extra tags can be
//! registered as aliases of a kind (for data written by older clients).
//! A tag maps to exactly one kind.

use std::collections::HashMap;

use tracing::debug;

use crate::delta::{Delta, DeltaKind, SerializedDelta};
use crate::errors::{ModelError, ModelResult};

#[derive(Debug, Clone, Default)]
pub struct DeltaFactory {
    kinds: HashMap<String, DeltaKind>,
}

impl DeltaFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing every built-in kind.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        for kind in DeltaKind::ALL {
            factory.kinds.insert(kind.tag().to_string(), kind);
        }
        factory
    }

    pub fn register(&mut self, kind: DeltaKind) -> ModelResult<()> {
        self.register_as(kind.tag(), kind)
    }

    /// Register `kind` under `tag`. Registering the same pair twice is fine;
    /// reusing a tag for another kind fails.
    pub fn register_as(&mut self, tag: &str, kind: DeltaKind) -> ModelResult<()> {
        match self.kinds.get(tag) {
            Some(existing) if *existing == kind => Ok(()),
            Some(existing) => Err(ModelError::DuplicateDeltaKind {
                tag: tag.to_string(),
                existing: existing.tag().to_string(),
            }),
            None => {
                debug!(tag, kind = %kind, "registering delta kind");
                self.kinds.insert(tag.to_string(), kind);
                Ok(())
            }
        }
    }

    pub fn kind(&self, tag: &str) -> Option<DeltaKind> {
        self.kinds.get(tag).copied()
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    pub fn decode(&self, serialized: SerializedDelta) -> ModelResult<Delta> {
        let kind = self
            .kind(&serialized.class_name)
            .ok_or_else(|| ModelError::UnknownDeltaKind(serialized.class_name.clone()))?;
        kind.reconstruct(serialized.operations)
    }

    pub fn from_value(&self, value: serde_json::Value) -> ModelResult<Delta> {
        self.decode(serde_json::from_value(value)?)
    }

    pub fn from_json(&self, json: &str) -> ModelResult<Delta> {
        self.decode(serde_json::from_str(json)?)
    }
}
