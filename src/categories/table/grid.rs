//! Table block
//!
//! ## Grid operations
//!
//! | Action | Effect | Floor |
//! |--------|--------|-------|
//! | `addRow` | append a row with one cell per column | none |
//! | `deleteRow` | remove row `index` (default last) | last row is kept |
//! | `addColumn` | append a cell to every row, widths become `1/n` | none |
//! | `deleteColumn` | remove cell `index` from every row, renormalize widths | last column is kept |
//! | `resizeColumn` | move the border between `index` and `index + 1` | `MIN_COLUMN_WIDTH` |
//! | `toggleHeaderRow` | flip `hasHeaderRow` | none |
//!
//! Hitting a floor yields `ActionOutcome::Refused` and leaves the grid as
//! it was.

use serde_json::Value;
use tracing::debug;

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction, TreeRole,
};

use super::cell::{TABLE_CELL, TABLE_ROW};

pub const TABLE: &str = "table";
pub const MIN_COLUMN_WIDTH: f64 = 0.05;

const DEFAULT_ROWS: usize = 2;
const DEFAULT_COLUMNS: usize = 2;
const WIDTH_TOLERANCE: f64 = 1e-6;

const TABLE_ACTIONS: [ToolbarAction; 5] = [
    ToolbarAction::new("addRow", "Add Row", "row-insert"),
    ToolbarAction::new("deleteRow", "Delete Row", "row-remove"),
    ToolbarAction::new("addColumn", "Add Column", "column-insert"),
    ToolbarAction::new("deleteColumn", "Delete Column", "column-remove"),
    ToolbarAction::new("toggleHeaderRow", "Header Row", "table-header"),
];

// ---------------------------------------------------------------------------
// TableBlock
// ---------------------------------------------------------------------------

pub struct TableBlock {
    metadata: BlockMetadata,
}

impl TableBlock {
    pub fn new() -> Self {
        Self {
            metadata: BlockMetadata::new(TABLE, "Table", "table", BlockCategory::Table)
                .with_description("Add a simple table")
                .with_keywords(&["grid", "rows", "columns", "spreadsheet"]),
        }
    }

    pub fn row_count(table: &Block) -> usize {
        table.children().len()
    }

    /// Widest row; rows are kept equal, so this is the column count.
    pub fn column_count(table: &Block) -> usize {
        table
            .children()
            .iter()
            .map(|row| row.children().len())
            .max()
            .unwrap_or(0)
    }

    /// Stored widths when they match the column count, else even widths.
    pub fn column_widths(table: &Block) -> Vec<f64> {
        let cols = Self::column_count(table);
        let stored: Option<Vec<f64>> = table
            .property("colWidths")
            .and_then(Value::as_array)
            .and_then(|arr| arr.iter().map(Value::as_f64).collect());

        match stored {
            Some(widths) if widths.len() == cols => widths,
            _ => even_widths(cols),
        }
    }

    fn set_widths(table: &mut Block, widths: Vec<f64>) {
        table.set_property(
            "colWidths",
            Value::Array(widths.into_iter().map(Value::from).collect()),
        );
    }

    pub fn add_row(table: &mut Block, registry: &BlockRegistry) -> Result<(), BlockError> {
        let cols = Self::column_count(table).max(1);
        let row = new_row(registry, cols)?;
        table.push_child(row);
        if Self::column_count(table) != Self::column_widths(table).len() {
            Self::set_widths(table, even_widths(cols));
        }
        Ok(())
    }

    /// Remove a row. Refuses the last remaining row.
    pub fn delete_row(table: &mut Block, index: usize) -> bool {
        let rows = Self::row_count(table);
        if rows <= 1 || index >= rows {
            return false;
        }
        table.children_mut().remove(index);
        true
    }

    pub fn add_column(table: &mut Block, registry: &BlockRegistry) -> Result<(), BlockError> {
        let mut cells = Vec::with_capacity(table.children().len());
        for _ in table.children() {
            cells.push(new_cell(registry)?);
        }

        for (row, cell) in table.children_mut().iter_mut().zip(cells) {
            row.push_child(cell);
        }

        let cols = Self::column_count(table);
        Self::set_widths(table, even_widths(cols));
        Ok(())
    }

    /// Remove one cell from every row and renormalize the remaining widths.
    /// Refuses the last remaining column.
    pub fn delete_column(table: &mut Block, index: usize) -> bool {
        let cols = Self::column_count(table);
        if cols <= 1 || index >= cols {
            return false;
        }

        let mut widths = Self::column_widths(table);
        for row in table.children_mut() {
            if index < row.children().len() {
                row.children_mut().remove(index);
            }
        }
        widths.remove(index);

        let total: f64 = widths.iter().sum();
        let widths = if total > WIDTH_TOLERANCE {
            widths.into_iter().map(|w| w / total).collect()
        } else {
            even_widths(cols - 1)
        };
        Self::set_widths(table, widths);
        true
    }

    /// Set column `index` to `width`, taking the difference from the
    /// column to its right. Both stay at or above `MIN_COLUMN_WIDTH`.
    pub fn resize_column(table: &mut Block, index: usize, width: f64) -> bool {
        let mut widths = Self::column_widths(table);
        if index + 1 >= widths.len() || !width.is_finite() {
            return false;
        }

        let pair = widths[index] + widths[index + 1];
        if pair < 2.0 * MIN_COLUMN_WIDTH {
            return false;
        }

        let left = width.clamp(MIN_COLUMN_WIDTH, pair - MIN_COLUMN_WIDTH);
        widths[index] = left;
        widths[index + 1] = pair - left;
        Self::set_widths(table, widths);
        true
    }

    /// Pad short rows and fix `colWidths` so the grid is rectangular.
    fn repair_grid(table: &mut Block, registry: &BlockRegistry) {
        let cols = Self::column_count(table);
        for row in table.children_mut() {
            while row.children().len() < cols {
                match new_cell(registry) {
                    Ok(cell) => row.push_child(cell),
                    Err(_) => break,
                }
            }
        }

        let widths = Self::column_widths(table);
        let total: f64 = widths.iter().sum();
        let stored_len = table
            .property("colWidths")
            .and_then(Value::as_array)
            .map(Vec::len);
        if stored_len != Some(cols) || (cols > 0 && (total - 1.0).abs() > 1e-3) {
            debug!(table = %table.id(), cols, "repairing column widths");
            Self::set_widths(table, even_widths(cols));
        }
    }
}

impl Default for TableBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVariant for TableBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn role(&self) -> TreeRole {
        TreeRole::Table
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::checkbox("hasHeaderRow", "Header Row"),
            PropertyField::number("tableWidthScale", "Table Width").with_range(0.25, 1.0, 0.05),
        ])
    }

    fn managed_properties(&self) -> &'static [&'static str] {
        &["colWidths"]
    }

    /// A table without rows starts as a 2x2 grid.
    fn initialize(&self, block: &mut Block, registry: &BlockRegistry) {
        block.default_property("hasHeaderRow", false);
        block.default_property("tableWidthScale", 1);

        if block.children().is_empty() {
            for _ in 0..DEFAULT_ROWS {
                match new_row(registry, DEFAULT_COLUMNS) {
                    Ok(row) => block.push_child(row),
                    Err(e) => {
                        debug!(error = %e, "cannot build default table grid");
                        return;
                    }
                }
            }
            Self::set_widths(block, even_widths(DEFAULT_COLUMNS));
        } else {
            Self::repair_grid(block, registry);
        }
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        let mut actions = TABLE_ACTIONS.to_vec();
        actions.push(ToolbarAction::SHOW_DETAILS);
        actions
    }

    fn handle_key_input(&self, _block: &Block, _key: &KeyInput) -> KeyOutcome {
        KeyOutcome::Ignored
    }

    fn handle_action(
        &self,
        block: &mut Block,
        action: &ActionRequest,
        registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        let outcome = match action.id.as_str() {
            "addRow" => {
                Self::add_row(block, registry)?;
                ActionOutcome::changed("add-table-row")
            }
            "deleteRow" => {
                let index = action
                    .index()
                    .unwrap_or_else(|| Self::row_count(block).saturating_sub(1));
                refused_unless(Self::delete_row(block, index), "delete-table-row")
            }
            "addColumn" => {
                Self::add_column(block, registry)?;
                ActionOutcome::changed("add-table-column")
            }
            "deleteColumn" => {
                let index = action
                    .index()
                    .unwrap_or_else(|| Self::column_count(block).saturating_sub(1));
                refused_unless(Self::delete_column(block, index), "delete-table-column")
            }
            "resizeColumn" => {
                let index = action.index().ok_or_else(|| missing(action, "index"))?;
                let width = action
                    .arg("width")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| missing(action, "width"))?;
                refused_unless(Self::resize_column(block, index, width), "resize-table-column")
            }
            "toggleHeaderRow" => {
                let current = block
                    .property("hasHeaderRow")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                block.set_property("hasHeaderRow", !current);
                ActionOutcome::changed("toggle-table-header")
            }
            "showDetails" => ActionOutcome::Delegated,
            other => return Err(BlockError::UnknownAction(other.to_string())),
        };

        if outcome == ActionOutcome::Refused {
            debug!(table = %block.id(), action = %action.id, "table change refused");
        }
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn even_widths(cols: usize) -> Vec<f64> {
    if cols == 0 {
        return Vec::new();
    }
    vec![1.0 / cols as f64; cols]
}

fn refused_unless(applied: bool, action_type: &str) -> ActionOutcome {
    if applied {
        ActionOutcome::changed(action_type)
    } else {
        ActionOutcome::Refused
    }
}

fn missing(action: &ActionRequest, arg: &str) -> BlockError {
    BlockError::InvalidArgument {
        action: action.id.clone(),
        reason: format!("missing '{}'", arg),
    }
}

/// A cell with one empty paragraph to type into.
fn new_cell(registry: &BlockRegistry) -> Result<Block, BlockError> {
    registry
        .create_block_instance(
            &BlockData::new(TABLE_CELL).with_children(vec![BlockData::new("paragraph")]),
        )
        .ok_or_else(|| BlockError::MissingType(TABLE_CELL.to_string()))
}

fn new_row(registry: &BlockRegistry, cols: usize) -> Result<Block, BlockError> {
    let mut row = registry
        .create_block_instance(&BlockData::new(TABLE_ROW))
        .ok_or_else(|| BlockError::MissingType(TABLE_ROW.to_string()))?;
    for _ in 0..cols {
        row.push_child(new_cell(registry)?);
    }
    Ok(row)
}
