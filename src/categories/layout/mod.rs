//! Structural layout blocks
//!
//! Containers group blocks, callouts frame them, and `columns`/`column`
//! lay them out side by side. Column layouts are kept normalized after
//! every delete or move by `normalize_column_layouts`.

pub mod callout;
pub mod columns;
pub mod container;

pub use callout::CalloutBlock;
pub use columns::{normalize_column_layouts, ColumnBlock, ColumnsBlock, COLUMN, COLUMNS};
pub use container::ContainerBlock;
