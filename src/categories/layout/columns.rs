//! Column layouts
//!
//! A `columns` block holds only `column` children, each with a `width`
//! fraction. Layouts are created by dropping blocks beside others and are
//! torn down automatically once they stop making sense:
//!
//! | columns left | result |
//! |---|---|
//! | 0 | the layout is removed |
//! | 1 | the layout is replaced by that column's children |
//! | n (after a removal) | widths rebalance to `1/n` |

use serde_json::Value;
use tracing::debug;

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{Block, BlockData, BlockError, BlockMetadata, BlockVariant, KeyInput, KeyOutcome, TreeRole};

pub const COLUMNS: &str = "columns";
pub const COLUMN: &str = "column";
pub const DEFAULT_COLUMN_WIDTH: f64 = 0.5;

// ---------------------------------------------------------------------------
// ColumnsBlock
// ---------------------------------------------------------------------------

pub struct ColumnsBlock {
    metadata: BlockMetadata,
}

impl ColumnsBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(COLUMNS, "Columns", "columns", BlockCategory::Layout)
                .with_description("Lay blocks out side by side")
                .hidden(),
        }
    }
}

impl Default for ColumnsBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for ColumnsBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Container
    }

    fn accepts_free_children(&self) -> bool {
        false
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }
}

// ---------------------------------------------------------------------------
// ColumnBlock
// ---------------------------------------------------------------------------

pub struct ColumnBlock {
    metadata: BlockMetadata,
}

impl ColumnBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(COLUMN, "Column", "column", BlockCategory::Layout).hidden(),
        }
    }
}

impl Default for ColumnBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for ColumnBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Container
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![PropertyField::select(
            "verticalAlign",
            "Vertical Alignment",
            &["top", "center", "bottom"],
        )])
    }

    fn initialize(&self, block: &mut Block, _registry: &BlockRegistry) {
        block.default_property("width", DEFAULT_COLUMN_WIDTH);
    }

    /// Widths are rebalanced by the layout.
    fn managed_properties(&self) -> &'static [&'static str] {
        &["width"]
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn column_width(column: &Block) -> f64 {
    column
        .property("width")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_COLUMN_WIDTH)
}

/// Give every column of a layout the same width.
pub fn rebalance_widths(layout: &mut Block) {
    let n = layout.children().len();
    if n == 0 {
        return;
    }
    let width = 1.0 / n as f64;
    for column in layout.children_mut() {
        column.set_property("width", width);
    }
}

/// A new column holding `children`.
pub fn new_column(registry: &BlockRegistry, children: Vec<Block>) -> Result<Block, BlockError> {
    let mut column = registry
        .create_block_instance(&BlockData::new(COLUMN))
        .ok_or_else(|| BlockError::MissingType(COLUMN.to_string()))?;
    for child in children {
        column.push_child(child);
    }
    Ok(column)
}

/// A two-column layout with `left` and `right` as column contents.
pub fn new_layout(
    registry: &BlockRegistry,
    left: Vec<Block>,
    right: Vec<Block>,
) -> Result<Block, BlockError> {
    let mut layout = registry
        .create_block_instance(&BlockData::new(COLUMNS))
        .ok_or_else(|| BlockError::MissingType(COLUMNS.to_string()))?;
    layout.push_child(new_column(registry, left)?);
    layout.push_child(new_column(registry, right)?);
    rebalance_widths(&mut layout);
    Ok(layout)
}

/// Drop empty columns and collapse degenerate layouts, bottom-up.
///
/// Returns true when anything changed. Parent links of promoted blocks are
/// left for the caller to reattach.
pub fn normalize_column_layouts(blocks: &mut Vec<Block>) -> bool {
    let mut changed = false;
    let mut i = 0;

    while i < blocks.len() {
        changed |= normalize_column_layouts(&mut blocks[i].children);

        if blocks[i].block_type != COLUMNS {
            i += 1;
            continue;
        }

        let before = blocks[i].children.len();
        blocks[i]
            .children
            .retain(|c| !(c.block_type == COLUMN && c.children.is_empty()));
        let remaining = blocks[i].children.len();

        match remaining {
            0 => {
                debug!(layout = %blocks[i].id, "removing empty column layout");
                blocks.remove(i);
                changed = true;
            }
            1 => {
                let mut layout = blocks.remove(i);
                let only = layout.children.remove(0);
                let promoted = if only.block_type == COLUMN {
                    only.children
                } else {
                    vec![only]
                };
                debug!(layout = %layout.id, promoted = promoted.len(), "unwrapping single-column layout");
                let n = promoted.len();
                blocks.splice(i..i, promoted);
                i += n;
                changed = true;
            }
            _ => {
                if remaining != before {
                    rebalance_widths(&mut blocks[i]);
                    changed = true;
                }
                i += 1;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_data(columns: Vec<Vec<&str>>) -> BlockData {
        BlockData::new(COLUMNS).with_id("layout").with_children(
            columns
                .into_iter()
                .map(|ids| {
                    BlockData::new(COLUMN).with_children(
                        ids.into_iter()
                            .map(|id| BlockData::new("paragraph").with_id(id))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_column_width_default() {
        let registry = BlockRegistry::with_builtin_blocks();
        let column = registry.create_block_instance(&BlockData::new(COLUMN)).unwrap();
        assert_eq!(column_width(&column), DEFAULT_COLUMN_WIDTH);
    }

    #[test]
    fn test_empty_column_is_removed_and_widths_rebalanced() {
        let registry = BlockRegistry::with_builtin_blocks();
        let (mut blocks, _) =
            registry.build_tree(&[layout_data(vec![vec!["a"], vec![], vec!["b"]])]);

        assert!(normalize_column_layouts(&mut blocks));
        let layout = &blocks[0];
        assert_eq!(layout.children().len(), 2);
        for column in layout.children() {
            assert!((column_width(column) - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_column_layout_is_unwrapped() {
        let registry = BlockRegistry::with_builtin_blocks();
        let (mut blocks, _) = registry.build_tree(&[
            BlockData::new("paragraph").with_id("before"),
            layout_data(vec![vec!["a", "b"], vec![]]),
            BlockData::new("paragraph").with_id("after"),
        ]);

        assert!(normalize_column_layouts(&mut blocks));
        let ids: Vec<&str> = blocks.iter().map(|b| b.id().as_str()).collect();
        assert_eq!(ids, vec!["before", "a", "b", "after"]);
    }

    #[test]
    fn test_layout_without_content_disappears() {
        let registry = BlockRegistry::with_builtin_blocks();
        let (mut blocks, _) = registry.build_tree(&[layout_data(vec![vec![], vec![]])]);
        assert!(normalize_column_layouts(&mut blocks));
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_healthy_layout_is_untouched() {
        let registry = BlockRegistry::with_builtin_blocks();
        let (mut blocks, _) = registry.build_tree(&[layout_data(vec![vec!["a"], vec!["b"]])]);
        blocks[0].children_mut()[0].set_property("width", 0.7);
        assert!(!normalize_column_layouts(&mut blocks));
        assert_eq!(column_width(&blocks[0].children()[0]), 0.7);
    }
}
