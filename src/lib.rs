//! Block Editor - core of a block-based document editor
//!
//! This crate provides the block tree and its variants, the registry that
//! builds blocks from serialized records, the mutation engine with its
//! change notifications, and snapshot-based undo/redo with typing
//! coalescing. Rendering is left to the host, which drains `EditorEvent`s
//! and reports user intent through `Editor` operations.

pub mod categories;
pub mod config;
pub mod core;
pub mod runtime;
mod tests;

// Re-export commonly used types
pub use categories::BlockCategory;
pub use config::{ConfigError, EditorConfig};
pub use core::{Block, BlockData, BlockId, BlockMetadata, BlockRegistry, BlockVariant};
pub use runtime::{DropPosition, Editor, EditorError, EditorEvent, HistoryManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
