//! Table rows and cells
//!
//! Neither appears in the block picker; both exist only inside a table,
//! whose actions are the sole way to add or remove them. A row holds cells
//! only, while a cell is an ordinary container for the blocks typed into it.

use crate::categories::BlockCategory;
use crate::core::{Block, BlockMetadata, BlockVariant, KeyInput, KeyOutcome, TreeRole};

pub const TABLE_ROW: &str = "tableRow";
pub const TABLE_CELL: &str = "tableCell";

pub struct TableRowBlock {
    metadata: BlockMetadata,
}

impl TableRowBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(TABLE_ROW, "Table Row", "row", BlockCategory::Table).hidden(),
        }
    }
}

impl Default for TableRowBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for TableRowBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Table
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }
}

/// Cell holding its own blocks. The cell itself takes no text.
pub struct TableCellBlock {
    metadata: BlockMetadata,
}

impl TableCellBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(TABLE_CELL, "Table Cell", "cell", BlockCategory::Table).hidden(),
        }
    }
}

impl Default for TableCellBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for TableCellBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Container
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }
}
