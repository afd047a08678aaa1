//! External content addresses: `path` or `path#subElementId`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::BlockId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_element: Option<BlockId>,
}

impl Locator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sub_element: None,
        }
    }

    pub fn with_sub_element(mut self, id: impl Into<BlockId>) -> Self {
        self.sub_element = Some(id.into());
        self
    }

    /// The page path, joined onto `root` when relative.
    pub fn resolve(&self, root: Option<&Path>) -> PathBuf {
        resolve_path(&self.path, root)
    }
}

/// Join a relative page path onto the workspace root.
pub fn resolve_path(path: &str, root: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        let (path, sub) = match s.split_once('#') {
            Some((path, sub)) => (path.trim(), Some(sub.trim())),
            None => (s, None),
        };

        if path.is_empty() {
            return Err(LocatorError::MissingPath(s.to_string()));
        }

        Ok(Self {
            path: path.to_string(),
            sub_element: sub.filter(|id| !id.is_empty()).map(BlockId::from),
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_element {
            Some(id) => write!(f, "{}#{}", self.path, id),
            None => f.write_str(&self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("Locator is empty")]
    Empty,

    #[error("Locator has no page path: {0}")]
    MissingPath(String),
}
