//! Document tree validation
//!
//! Checks a live block tree for structural problems: duplicate ids, stale
//! parent links, virtual blocks that own children, ragged tables and
//! column layouts whose widths drift. Produces a `TreeValidationResult`
//! the editor logs after loads and history restores.

use std::collections::HashSet;

use serde_json::Value;

use crate::categories::layout::columns::{column_width, COLUMN, COLUMNS};
use crate::categories::table::{TableBlock, TABLE, TABLE_CELL, TABLE_ROW};
use crate::core::tree;
use crate::core::{Block, BlockId, TreeRole};

const WIDTH_TOLERANCE: f64 = 1e-3;

// ── Result types ────────────────────────────────────────────────────────────

/// A single validation error with optional location and suggestion.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Block where the problem was found (if applicable).
    pub block_id: Option<BlockId>,
    /// Human-readable description.
    pub message: String,
    /// Optional suggestion for how to fix it.
    pub suggestion: Option<String>,
}

/// A non-fatal warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub block_id: Option<BlockId>,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TreeValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl TreeValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_error(&mut self, block_id: Option<&BlockId>, message: impl Into<String>, suggestion: Option<&str>) {
        self.valid = false;
        self.errors.push(ValidationError {
            block_id: block_id.cloned(),
            message: message.into(),
            suggestion: suggestion.map(|s| s.to_string()),
        });
    }

    fn add_warning(&mut self, block_id: Option<&BlockId>, message: impl Into<String>, suggestion: Option<&str>) {
        self.warnings.push(ValidationWarning {
            block_id: block_id.cloned(),
            message: message.into(),
            suggestion: suggestion.map(|s| s.to_string()),
        });
    }

    /// Merge another result into this one.
    fn merge(&mut self, other: TreeValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_clean(&self) -> bool {
        self.valid && self.warnings.is_empty()
    }
}

// ── Validator ───────────────────────────────────────────────────────────────

pub struct TreeValidator;

impl TreeValidator {
    /// Run every check against a root sequence.
    pub fn validate(blocks: &[Block]) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();

        result.merge(Self::check_unique_ids(blocks));
        result.merge(Self::check_parent_links(blocks, None));
        result.merge(Self::check_virtual_blocks(blocks));
        result.merge(Self::check_tables(blocks));
        result.merge(Self::check_column_layouts(blocks));

        result
    }

    // ── Individual checks ───────────────────────────────────────────────

    fn check_unique_ids(blocks: &[Block]) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();
        let mut seen = HashSet::new();
        tree::walk(blocks, &mut |block| {
            if !seen.insert(block.id()) {
                result.add_error(
                    Some(block.id()),
                    format!("Block id '{}' appears more than once", block.id()),
                    Some("Assign a fresh id to the duplicate"),
                );
            }
        });
        result
    }

    /// Every block's parent link names the block that actually holds it.
    fn check_parent_links(blocks: &[Block], parent: Option<&BlockId>) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();
        for block in blocks {
            if block.parent() != parent {
                result.add_error(
                    Some(block.id()),
                    format!(
                        "Block '{}' points at parent {:?} but sits under {:?}",
                        block.id(),
                        block.parent().map(BlockId::as_str),
                        parent.map(BlockId::as_str)
                    ),
                    Some("Reattach parent links after structural edits"),
                );
            }
            result.merge(Self::check_parent_links(block.children(), Some(block.id())));
        }
        result
    }

    fn check_virtual_blocks(blocks: &[Block]) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();
        tree::walk(blocks, &mut |block| {
            if block.role() == TreeRole::Virtual && !block.children().is_empty() {
                result.add_error(
                    Some(block.id()),
                    format!("Virtual block '{}' owns {} children", block.id(), block.children().len()),
                    Some("Virtual blocks display resolved content and never own children"),
                );
            }
        });
        result
    }

    /// Tables hold rows, rows hold cells, every row has the same number of
    /// cells and `colWidths` matches and sums to one.
    fn check_tables(blocks: &[Block]) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();
        tree::walk(blocks, &mut |block| {
            if block.block_type() != TABLE {
                return;
            }

            let cols = TableBlock::column_count(block);
            for row in block.children() {
                if row.block_type() != TABLE_ROW {
                    result.add_error(
                        Some(row.id()),
                        format!("Table '{}' holds a '{}' where a row belongs", block.id(), row.block_type()),
                        None,
                    );
                    continue;
                }
                if row.children().len() != cols {
                    result.add_error(
                        Some(row.id()),
                        format!("Row '{}' has {} cells, expected {}", row.id(), row.children().len(), cols),
                        Some("Pad short rows with empty cells"),
                    );
                }
                for cell in row.children() {
                    if cell.block_type() != TABLE_CELL {
                        result.add_error(
                            Some(cell.id()),
                            format!("Row '{}' holds a '{}' where a cell belongs", row.id(), cell.block_type()),
                            None,
                        );
                    }
                }
            }

            let stored: Option<Vec<f64>> = block
                .property("colWidths")
                .and_then(Value::as_array)
                .and_then(|arr| arr.iter().map(Value::as_f64).collect());
            match stored {
                Some(widths) if widths.len() == cols => {
                    let total: f64 = widths.iter().sum();
                    if cols > 0 && (total - 1.0).abs() > WIDTH_TOLERANCE {
                        result.add_error(
                            Some(block.id()),
                            format!("Column widths of table '{}' sum to {:.3}", block.id(), total),
                            Some("Renormalize colWidths"),
                        );
                    }
                }
                _ => result.add_error(
                    Some(block.id()),
                    format!("Table '{}' has no colWidths entry per column", block.id()),
                    Some("Renormalize colWidths"),
                ),
            }
        });
        result
    }

    /// Column layouts hold at least two columns whose widths sum to one.
    fn check_column_layouts(blocks: &[Block]) -> TreeValidationResult {
        let mut result = TreeValidationResult::ok();
        tree::walk(blocks, &mut |block| {
            if block.block_type() != COLUMNS {
                return;
            }

            if block.children().len() < 2 {
                result.add_warning(
                    Some(block.id()),
                    format!("Column layout '{}' has {} columns", block.id(), block.children().len()),
                    Some("Unwrap layouts with fewer than two columns"),
                );
            }

            let mut total = 0.0;
            for column in block.children() {
                if column.block_type() != COLUMN {
                    result.add_error(
                        Some(column.id()),
                        format!("Layout '{}' holds a '{}' where a column belongs", block.id(), column.block_type()),
                        None,
                    );
                }
                total += column_width(column);
            }
            if !block.children().is_empty() && (total - 1.0).abs() > WIDTH_TOLERANCE {
                result.add_warning(
                    Some(block.id()),
                    format!("Column widths of layout '{}' sum to {:.3}", block.id(), total),
                    Some("Rebalance column widths"),
                );
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockData, BlockRegistry};

    fn build(data: Vec<BlockData>) -> Vec<Block> {
        BlockRegistry::with_builtin_blocks().build_tree(&data).0
    }

    #[test]
    fn test_fresh_tree_is_valid() {
        let blocks = build(vec![
            BlockData::new("paragraph"),
            BlockData::new("table"),
            BlockData::new("quote"),
            BlockData::new("callout"),
        ]);
        let result = TreeValidator::validate(&blocks);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.is_clean());
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let blocks = build(vec![
            BlockData::new("paragraph").with_id("x"),
            BlockData::new("paragraph").with_id("x"),
        ]);
        let result = TreeValidator::validate(&blocks);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].block_id, Some("x".into()));
    }

    #[test]
    fn test_stale_parent_link_reported() {
        let mut blocks = build(vec![BlockData::new("container")
            .with_id("box")
            .with_children(vec![BlockData::new("paragraph").with_id("p")])]);
        let child = blocks[0].children_mut().remove(0);
        blocks.push(child);

        let result = TreeValidator::validate(&blocks);
        assert!(!result.valid);

        tree::reattach_parents(&mut blocks, None);
        assert!(TreeValidator::validate(&blocks).valid);
    }

    #[test]
    fn test_ragged_table_reported() {
        let mut blocks = build(vec![BlockData::new("table").with_id("t")]);
        blocks[0].children_mut()[0].children_mut().pop();
        let result = TreeValidator::validate(&blocks);
        assert!(!result.valid);
    }

    #[test]
    fn test_lopsided_columns_warn() {
        let mut blocks = build(vec![BlockData::new(COLUMNS).with_id("l").with_children(vec![
            BlockData::new(COLUMN).with_children(vec![BlockData::new("paragraph")]),
            BlockData::new(COLUMN).with_children(vec![BlockData::new("paragraph")]),
        ])]);
        blocks[0].children_mut()[0].set_property("width", 0.9);
        let result = TreeValidator::validate(&blocks);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
