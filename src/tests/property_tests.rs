//! Property-based tests using proptest.
//!
//! These tests verify invariants that must hold for *any* document or edit
//! sequence, catching edge cases that hand-written tests miss.

use proptest::prelude::*;

use super::support::editor_with;
use crate::categories::table::TableBlock;
use crate::core::{ActionRequest, BlockData, BlockRegistry};
use crate::runtime::{Editor, TreeValidator};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn text_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("paragraph"),
        Just("heading1"),
        Just("bulletedListItem"),
        Just("numberedListItem"),
        Just("todoListItem"),
    ]
}

fn leaf_record() -> impl Strategy<Value = BlockData> {
    (text_type(), "[a-z <>/]{0,12}").prop_map(|(t, content)| BlockData::new(t).with_content(content))
}

/// Flat records or containers of them.
fn record() -> impl Strategy<Value = BlockData> {
    prop_oneof![
        3 => leaf_record(),
        1 => prop::collection::vec(leaf_record(), 0..4)
            .prop_map(|children| BlockData::new("container").with_children(children)),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Delete(usize),
    Edit(usize, String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<usize>().prop_map(Op::Insert),
        any::<usize>().prop_map(Op::Delete),
        (any::<usize>(), "[a-z]{1,8}").prop_map(|(i, s)| Op::Edit(i, s)),
    ]
}

fn apply(editor: &mut Editor, op: &Op) {
    let roots: Vec<_> = editor.blocks().iter().map(|b| b.id().clone()).collect();
    match op {
        Op::Insert(i) => {
            let reference = if roots.is_empty() { None } else { Some(&roots[i % roots.len()]) };
            editor.insert_new_block_after(reference, None).unwrap();
        }
        Op::Delete(i) if !roots.is_empty() => {
            editor.delete_block(&roots[i % roots.len()]).unwrap();
        }
        Op::Edit(i, text) if !roots.is_empty() => {
            editor.update_content(&roots[i % roots.len()], text).unwrap();
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Document properties
// ---------------------------------------------------------------------------

proptest! {
    /// Serializing a loaded document and loading it again is stable.
    #[test]
    fn load_serialize_round_trip(records in prop::collection::vec(record(), 0..8)) {
        let (first, _) = editor_with(records);
        let once = first.serialize_document();

        let (second, _) = editor_with(once.clone());
        prop_assert_eq!(second.serialize_document(), once);
    }

    /// Built trees always pass validation: ids are unique and every
    /// parent link points at the enclosing block.
    #[test]
    fn built_tree_is_valid(records in prop::collection::vec(record(), 0..8)) {
        let registry = BlockRegistry::with_builtin_blocks();
        let (blocks, skipped) = registry.build_tree(&records);
        prop_assert_eq!(skipped, 0);
        prop_assert!(TreeValidator::validate(&blocks).valid);
    }

    /// Undoing every edit returns to the loaded document; redoing every
    /// edit returns to the final one.
    #[test]
    fn undo_then_redo_restores(
        records in prop::collection::vec(leaf_record(), 1..5),
        ops in prop::collection::vec(op(), 0..20),
    ) {
        let (mut editor, _) = editor_with(records);
        let initial = editor.serialize_document();

        for op in &ops {
            apply(&mut editor, op);
        }
        let last = editor.serialize_document();
        prop_assert!(TreeValidator::validate(editor.blocks()).valid);

        while editor.undo().unwrap() {}
        prop_assert_eq!(editor.serialize_document(), initial);

        while editor.redo().unwrap() {}
        prop_assert_eq!(editor.serialize_document(), last);
    }
}

// ---------------------------------------------------------------------------
// Table properties
// ---------------------------------------------------------------------------

proptest! {
    /// Deleting any column of an RxC grid leaves R rows of C-1 cells whose
    /// widths still sum to 1.
    #[test]
    fn delete_column_keeps_widths_normalized(
        rows in 1..5usize,
        extra_cols in 1..5usize,
        index in 0..10usize,
    ) {
        let (mut editor, _) = editor_with(vec![BlockData::new("table").with_id("t")]);
        let t = "t".into();
        for _ in 1..rows {
            editor.handle_action(&t, &ActionRequest::new("addRow")).unwrap();
        }
        // Default grid has two columns.
        for _ in 2..(extra_cols + 1) {
            editor.handle_action(&t, &ActionRequest::new("addColumn")).unwrap();
        }
        let cols = TableBlock::column_count(editor.find_block(&t).unwrap());
        let rows = TableBlock::row_count(editor.find_block(&t).unwrap());
        let index = index % cols;

        editor
            .handle_action(&t, &ActionRequest::new("deleteColumn").with_value(index))
            .unwrap();

        let table = editor.find_block(&t).unwrap();
        prop_assert_eq!(TableBlock::row_count(table), rows);
        prop_assert!(table.children().iter().all(|r| r.children().len() == cols - 1));
        let total: f64 = TableBlock::column_widths(table).iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }
}
