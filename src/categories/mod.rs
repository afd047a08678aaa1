//! Block categories and built-in block types
//!
//! Each submodule implements the variants of one picker group. The engine
//! never branches on type tags; everything type-specific lives here behind
//! `BlockVariant`.

pub mod layout;
pub mod list;
pub mod media;
pub mod reference;
pub mod table;
pub mod text;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::BlockVariant;

/// Block category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockCategory {
    /// Paragraphs, headings and code
    Text,
    /// Bulleted, numbered, todo and toggle items
    List,
    /// Containers, callouts and column layouts
    Layout,
    /// Tables and their rows and cells
    Table,
    /// Images and link buttons
    Media,
    /// Blocks whose content comes from elsewhere
    Reference,
}

impl BlockCategory {
    /// Get a human-readable name for the category
    pub fn display_name(&self) -> &str {
        match self {
            BlockCategory::Text => "Text",
            BlockCategory::List => "Lists",
            BlockCategory::Layout => "Layout",
            BlockCategory::Table => "Table",
            BlockCategory::Media => "Media",
            BlockCategory::Reference => "References",
        }
    }
}

impl std::fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Every built-in variant, in picker order.
pub fn builtin_variants() -> Vec<Arc<dyn BlockVariant>> {
    vec![
        Arc::new(text::TextBlock::paragraph()),
        Arc::new(text::TextBlock::heading(1)),
        Arc::new(text::TextBlock::heading(2)),
        Arc::new(text::TextBlock::heading(3)),
        Arc::new(text::CodeBlock::new()),
        Arc::new(list::BulletedListItemBlock::new()),
        Arc::new(list::NumberedListItemBlock::new()),
        Arc::new(list::TodoListItemBlock::new()),
        Arc::new(list::ToggleListItemBlock::new()),
        Arc::new(layout::ContainerBlock::new()),
        Arc::new(layout::CalloutBlock::new()),
        Arc::new(layout::ColumnsBlock::new()),
        Arc::new(layout::ColumnBlock::new()),
        Arc::new(table::TableBlock::new()),
        Arc::new(table::TableRowBlock::new()),
        Arc::new(table::TableCellBlock::new()),
        Arc::new(media::ImageBlock::new()),
        Arc::new(media::LinkButtonBlock::new()),
        Arc::new(reference::QuoteBlock::new()),
    ]
}
