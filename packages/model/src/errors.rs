//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid location {root}:{path:?}: {reason}")]
    InvalidLocation {
        root: String,
        path: Vec<usize>,
        reason: String,
    },

    #[error("Cannot compare positions in different roots ({left} and {right})")]
    DifferentRoots { left: String, right: String },

    #[error("Cannot split the root element at {root}:{path:?}")]
    CannotSplitRoot { root: String, path: Vec<usize> },

    #[error("Nothing to merge at {root}:{path:?}")]
    NothingToMerge { root: String, path: Vec<usize> },

    #[error("Wrapper element must be empty (has {children} children)")]
    WrapperNotEmpty { children: usize },

    #[error("Version mismatch: document is at {expected}, operation expects {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("History for version {requested} is no longer retained (oldest: {oldest})")]
    HistoryUnavailable { requested: u64, oldest: u64 },

    #[error("Attribute '{key}' mismatch: expected {expected}, found {found}")]
    AttributeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Element name mismatch: expected '{expected}', found '{found}'")]
    NameMismatch { expected: String, found: String },

    #[error("Marker '{name}' does not match the operation's old range")]
    MarkerMismatch { name: String },

    #[error("Root not found: {0}")]
    RootNotFound(String),

    #[error("Root already exists: {0}")]
    DuplicateRoot(String),

    #[error("Unknown delta kind: {0}")]
    UnknownDeltaKind(String),

    #[error("Delta kind '{tag}' is already registered as '{existing}'")]
    DuplicateDeltaKind { tag: String, existing: String },

    #[error("Malformed '{class_name}' delta: {reason}")]
    MalformedDelta { class_name: String, reason: String },

    /// Undoing the executed part of a failed delta failed too; the tree may
    /// hold a partial change.
    #[error("Rollback stopped at a {operation} operation: {source}")]
    RollbackFailed {
        operation: &'static str,
        #[source]
        source: Box<ModelError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn invalid_location(
        root: impl Into<String>,
        path: &[usize],
        reason: impl Into<String>,
    ) -> Self {
        ModelError::InvalidLocation {
            root: root.into(),
            path: path.to_vec(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's view of the document being stale.
    pub fn is_version_error(&self) -> bool {
        matches!(
            self,
            ModelError::VersionMismatch { .. } | ModelError::HistoryUnavailable { .. }
        )
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
