//! Editor configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::history::{DEFAULT_CAPACITY, DEFAULT_DEBOUNCE_MS};

pub const DEFAULT_CONFIG_NAME: &str = "editor.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo snapshots kept
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Quiet period after the last keystroke before typing history settles
    #[serde(default = "default_typing_debounce_ms")]
    pub typing_debounce_ms: u64,

    /// How long a quote waits for its referenced content
    #[serde(default = "default_reference_timeout_ms")]
    pub reference_timeout_ms: u64,

    /// Directory relative quote locators resolve against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Type inserted when none is given
    #[serde(default = "default_block_type")]
    pub default_block_type: String,
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_typing_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_reference_timeout_ms() -> u64 {
    5_000
}

fn default_block_type() -> String {
    "paragraph".to_string()
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or the defaults when it does not exist.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load `editor.config.json` from a directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_path(dir.as_ref().join(DEFAULT_CONFIG_NAME))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("historyCapacity must be at least 1".into()));
        }
        if self.default_block_type.trim().is_empty() {
            return Err(ConfigError::Invalid("defaultBlockType cannot be empty".into()));
        }
        Ok(())
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_typing_debounce_ms(mut self, ms: u64) -> Self {
        self.typing_debounce_ms = ms;
        self
    }

    pub fn with_reference_timeout_ms(mut self, ms: u64) -> Self {
        self.reference_timeout_ms = ms;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            typing_debounce_ms: default_typing_debounce_ms(),
            reference_timeout_ms: default_reference_timeout_ms(),
            workspace_root: None,
            default_block_type: default_block_type(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
