//! Core block abstractions and types
//!
//! This module defines the block node, the variant trait every block type
//! implements, the property schema, the factory registry and the tree
//! helpers the mutation engine is built on.

pub mod block;
pub mod parameter;
pub mod registry;
pub mod tree;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub use block::{
    ActionOutcome, ActionRequest, Block, BlockError, BlockMetadata, BlockVariant, Key, KeyInput,
    KeyOutcome, ToolbarAction, TreeRole,
};
pub use registry::{BlockRegistry, RegistryError};
pub use tree::BlockLocation;

/// Open string-keyed property map carried by every block.
///
/// Backed by `serde_json::Map`, which keeps keys sorted, so serialized
/// snapshots are deterministic.
pub type Properties = serde_json::Map<String, Value>;

/// Unique identifier for a block
///
/// Fresh ids are UUID v4 strings. Ids read from a stored document are
/// accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a new random block ID
    pub fn new() -> Self {
        BlockId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        BlockId(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        BlockId(s)
    }
}

/// Serialized block record: `{id, type, content, properties, children}`.
///
/// This is both the on-disk document format and the history snapshot
/// format. A missing `id` means "assign a fresh one on construction".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub children: Vec<BlockData>,
}

impl BlockData {
    /// Create an empty record of the given type with no id
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            id: None,
            block_type: block_type.into(),
            content: String::new(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<BlockData>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first pre-order walk over this record and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a BlockData)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
