//! Table block implementations
//!
//! A table owns a grid of `tableRow` children, each holding one `tableCell`
//! per column. Column widths live on the table as `colWidths`, a list of
//! fractions that always matches the column count and sums to 1.0.

pub mod cell;
pub mod grid;

pub use cell::{TableCellBlock, TableRowBlock, TABLE_CELL, TABLE_ROW};
pub use grid::{TableBlock, MIN_COLUMN_WIDTH, TABLE};
