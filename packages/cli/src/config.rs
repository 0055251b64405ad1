use scribe_model::{DocumentOptions, SessionId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Scribe configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// History entries a replayed document keeps (unlimited when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Undo levels kept for the local session's deltas
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Session that replayed deltas are attributed to when they are local
    #[serde(default)]
    pub session_id: u64,

    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_undo_levels() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load an explicitly named config file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn document_options(&self, session: SessionId) -> DocumentOptions {
        DocumentOptions {
            history_limit: self.history_limit,
            session,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: None,
            undo_levels: default_undo_levels(),
            session_id: 0,
            log_level: default_log_level(),
        }
    }
}
