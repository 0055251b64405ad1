pub mod check;
pub mod replay;

pub use check::{check, CheckArgs};
pub use replay::{replay, ReplayArgs};

use scribe_model::{Delta, DeltaFactory, SessionId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// One line of a delta log: a serialized delta and the session that made it
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub session: u64,
    pub delta: serde_json::Value,
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in {}: {}", path.display(), e))
}

/// Read a log file and decode every delta in it.
pub(crate) fn decode_log(path: &Path) -> anyhow::Result<Vec<(SessionId, Delta)>> {
    let entries: Vec<LogEntry> = read_json(path)?;
    let factory = DeltaFactory::with_builtin();

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let delta = factory
                .from_value(entry.delta)
                .map_err(|e| anyhow::anyhow!("Log entry {}: {}", index, e))?;
            Ok((SessionId(entry.session), delta))
        })
        .collect()
}
