//! Tests for the mutation engine

use serde_json::json;
use std::sync::Arc;

use super::support::{changed_types, editor_with, id, paragraph, root_ids, PAGE};
use crate::config::EditorConfig;
use crate::core::{ActionOutcome, ActionRequest, BlockData, BlockRegistry, Key, KeyInput, KeyOutcome};
use crate::runtime::{Editor, EditorError, EditorEvent, ManualClock, ReferenceIndex};

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_type_among_valid_siblings() {
    let (editor, _) = editor_with(vec![
        paragraph("a", "one"),
        BlockData::new("doesNotExist").with_id("x"),
        paragraph("b", "two"),
        paragraph("c", "three"),
    ]);
    assert_eq!(root_ids(&editor), vec!["a", "b", "c"]);
}

#[test]
fn test_load_report() {
    let (mut editor, _) = editor_with(vec![]);
    let report = editor.load_page(
        Some(PAGE),
        &[
            paragraph("dup", ""),
            BlockData::new("container")
                .with_id("box")
                .with_children(vec![paragraph("dup", ""), BlockData::new("nope")]),
        ],
    );
    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.repaired_ids, 1);
    assert!(!editor.is_dirty());
    assert_eq!(editor.drain_events(), vec![EditorEvent::RenderAll]);
}

#[test]
fn test_switch_document_drops_history() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    editor.insert_new_block_after(Some(&id("a")), None).unwrap();
    assert!(editor.can_undo());

    editor.switch_document("other.json", &[paragraph("z", "")]);
    assert_eq!(editor.path(), Some("other.json"));
    assert!(!editor.can_undo());
    assert!(!editor.undo().unwrap());
    assert_eq!(root_ids(&editor), vec!["z"]);
}

// ---------------------------------------------------------------------------
// Insert and delete
// ---------------------------------------------------------------------------

#[test]
fn test_insert_after_reference() {
    let (mut editor, _) = editor_with(vec![paragraph("a", ""), paragraph("b", "")]);
    let new_id = editor.insert_new_block_after(Some(&id("a")), Some("heading2")).unwrap();

    let ids = root_ids(&editor);
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[1], new_id.to_string());
    let block = editor.find_block(&new_id).unwrap();
    assert_eq!(block.block_type(), "heading2");
    assert!(block.parent().is_none());

    let events = editor.drain_events();
    assert!(events.contains(&EditorEvent::Focus { block_id: new_id.clone() }));
    assert_eq!(changed_types(&events), vec!["insert-block"]);
    assert!(editor.is_dirty());
}

#[test]
fn test_insert_without_reference_goes_to_top() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    let new_id = editor.insert_new_block_after(None, None).unwrap();
    assert_eq!(root_ids(&editor)[0], new_id.to_string());
    assert_eq!(editor.find_block(&new_id).unwrap().block_type(), "paragraph");
}

#[test]
fn test_insert_nested_sets_parent() {
    let (mut editor, _) = editor_with(vec![BlockData::new("container")
        .with_id("box")
        .with_children(vec![paragraph("p", "")])]);
    let new_id = editor.insert_new_block_after(Some(&id("p")), None).unwrap();

    let location = editor.find_block_instance_and_parent(&new_id).unwrap();
    assert_eq!(location.parent, Some(id("box")));
    assert_eq!(location.index, 1);
    assert_eq!(editor.find_block(&new_id).unwrap().parent(), Some(&id("box")));
}

#[test]
fn test_insert_unknown_type_fails_cleanly() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    let err = editor.insert_new_block_after(Some(&id("a")), Some("doesNotExist"));
    assert!(matches!(err, Err(EditorError::UnknownBlockType(_))));
    assert_eq!(root_ids(&editor), vec!["a"]);
}

#[test]
fn test_insert_missing_reference() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    let err = editor.insert_new_block_after(Some(&id("ghost")), None);
    assert!(matches!(err, Err(EditorError::BlockNotFound(_))));
    assert!(!editor.is_dirty());
}

#[test]
fn test_delete_takes_subtree() {
    let (mut editor, _) = editor_with(vec![
        paragraph("a", ""),
        BlockData::new("toggleListItem")
            .with_id("t")
            .with_children(vec![paragraph("inner", "hidden")]),
    ]);
    let removed = editor.delete_block(&id("t")).unwrap();
    assert_eq!(removed.children.len(), 1);
    assert_eq!(root_ids(&editor), vec!["a"]);
    assert!(editor.find_block(&id("inner")).is_none());

    let events = editor.drain_events();
    assert!(events.contains(&EditorEvent::RenderAll));
    assert_eq!(changed_types(&events), vec!["delete-block"]);
}

#[test]
fn test_delete_missing_block_is_error() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    assert!(matches!(
        editor.delete_block(&id("ghost")),
        Err(EditorError::BlockNotFound(_))
    ));
    assert_eq!(root_ids(&editor), vec!["a"]);
    assert!(editor.drain_events().is_empty());
}

#[test]
fn test_batch_delete_is_one_entry() {
    let (mut editor, _) = editor_with(vec![
        paragraph("a", ""),
        paragraph("b", ""),
        paragraph("c", ""),
    ]);
    let deleted = editor
        .delete_multiple_blocks(&[id("a"), id("ghost"), id("c")])
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(root_ids(&editor), vec!["b"]);
    assert_eq!(editor.history().undo_len(), 2);
    assert_eq!(changed_types(&editor.drain_events()), vec!["batch-delete"]);

    assert!(editor.undo().unwrap());
    assert_eq!(root_ids(&editor), vec!["a", "b", "c"]);
}

#[test]
fn test_batch_delete_of_nothing_is_silent() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    assert_eq!(editor.delete_multiple_blocks(&[id("ghost")]).unwrap(), 0);
    assert!(changed_types(&editor.drain_events()).is_empty());
    assert!(!editor.is_dirty());
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[test]
fn test_todo_enter_inserts_unchecked_todo() {
    let (mut editor, _) = editor_with(vec![BlockData::new("todoListItem")
        .with_id("t1")
        .with_content("Buy milk")
        .with_property("checked", true)]);

    let outcome = editor.handle_key_input(&id("t1"), KeyInput::new(Key::Enter)).unwrap();
    assert!(matches!(outcome, KeyOutcome::InsertAfter(_)));

    let blocks = editor.blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].content(), "Buy milk");
    assert_eq!(blocks[0].property("checked"), Some(&json!(true)));
    assert_eq!(blocks[1].block_type(), "todoListItem");
    assert_eq!(blocks[1].content(), "");
    assert_eq!(blocks[1].property("checked"), Some(&json!(false)));

    let new_id = blocks[1].id().clone();
    let events = editor.drain_events();
    assert!(events.contains(&EditorEvent::Focus { block_id: new_id }));
}

#[test]
fn test_enter_reconciles_draft_first() {
    let (mut editor, _) = editor_with(vec![paragraph("p", "")]);
    editor.report_input(&id("p"), "typed").unwrap();
    editor.handle_key_input(&id("p"), KeyInput::new(Key::Enter)).unwrap();

    let block = editor.find_block(&id("p")).unwrap();
    assert_eq!(block.content(), "typed");
    assert!(block.draft().is_none());
}

/// A refused Enter leaves the typed draft pending.
#[test]
fn test_refused_enter_keeps_draft() {
    let (mut editor, _) = editor_with(vec![BlockData::new("columns").with_id("layout").with_children(vec![
        BlockData::new("column").with_children(vec![paragraph("y", "")]),
        paragraph("p", ""),
    ])]);
    editor.report_input(&id("p"), "typed").unwrap();
    editor.drain_events();

    let err = editor.handle_key_input(&id("p"), KeyInput::new(Key::Enter));
    assert!(matches!(err, Err(EditorError::StructureViolation(_))));

    let block = editor.find_block(&id("p")).unwrap();
    assert_eq!(block.content(), "");
    assert_eq!(block.draft(), Some("typed"));
    assert!(editor.drain_events().is_empty());
}

#[test]
fn test_code_block_survives_load_and_save() {
    let (mut editor, _) = editor_with(vec![
        BlockData::new("code")
            .with_id("k")
            .with_content("let x = 1;")
            .with_property("language", "rust"),
        paragraph("a", ""),
    ]);
    assert_eq!(root_ids(&editor), vec!["k", "a"]);

    let outcome = editor.handle_key_input(&id("k"), KeyInput::new(Key::Enter)).unwrap();
    assert_eq!(outcome, KeyOutcome::SoftBreak);
    assert_eq!(root_ids(&editor), vec!["k", "a"]);

    editor
        .handle_action(&id("k"), &ActionRequest::new("setLanguage").with_value("python"))
        .unwrap();
    let saved = editor.save().unwrap();
    assert_eq!(saved[0].block_type, "code");
    assert_eq!(saved[0].content, "let x = 1;");
    assert_eq!(saved[0].properties.get("language"), Some(&json!("python")));
    assert_eq!(changed_types(&editor.drain_events()), vec!["change-language"]);
}

#[test]
fn test_numbered_enter_continues() {
    let (mut editor, _) = editor_with(vec![BlockData::new("numberedListItem")
        .with_id("n")
        .with_property("number", 3)]);
    editor.handle_key_input(&id("n"), KeyInput::new(Key::Enter)).unwrap();
    assert_eq!(editor.blocks()[1].property("number"), Some(&json!(4)));
}

#[test]
fn test_heading_enter_yields_paragraph() {
    let (mut editor, _) = editor_with(vec![BlockData::new("heading1").with_id("h").with_content("Title")]);
    editor.handle_key_input(&id("h"), KeyInput::new(Key::Enter)).unwrap();
    assert_eq!(editor.blocks()[1].block_type(), "paragraph");
}

#[test]
fn test_shift_enter_is_soft_break() {
    let (mut editor, _) = editor_with(vec![paragraph("p", "x")]);
    let outcome = editor
        .handle_key_input(&id("p"), KeyInput::new(Key::Enter).with_shift())
        .unwrap();
    assert_eq!(outcome, KeyOutcome::SoftBreak);
    assert_eq!(editor.blocks().len(), 1);
    assert!(editor.drain_events().is_empty());
}

#[test]
fn test_backspace_on_empty_focuses_previous_sibling() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "keep"), paragraph("b", "<br>")]);
    let outcome = editor.handle_key_input(&id("b"), KeyInput::new(Key::Backspace)).unwrap();
    assert_eq!(outcome, KeyOutcome::DeleteSelf);
    assert_eq!(root_ids(&editor), vec!["a"]);
    assert!(editor
        .drain_events()
        .contains(&EditorEvent::Focus { block_id: id("a") }));
}

#[test]
fn test_backspace_on_first_child_focuses_parent() {
    let (mut editor, _) = editor_with(vec![BlockData::new("container")
        .with_id("box")
        .with_children(vec![paragraph("only", ""), paragraph("next", "x")])]);
    assert_eq!(editor.focus_target_for_delete(&id("only")), Some(id("box")));
    assert_eq!(editor.focus_target_for_delete(&id("next")), Some(id("only")));

    editor.handle_key_input(&id("only"), KeyInput::new(Key::Delete)).unwrap();
    assert!(editor
        .drain_events()
        .contains(&EditorEvent::Focus { block_id: id("box") }));
}

#[test]
fn test_backspace_with_content_is_ignored() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "text")]);
    let outcome = editor.handle_key_input(&id("a"), KeyInput::new(Key::Backspace)).unwrap();
    assert_eq!(outcome, KeyOutcome::Ignored);
    assert_eq!(editor.blocks().len(), 1);
}

#[test]
fn test_slash_opens_command_menu() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    editor.handle_key_input(&id("a"), KeyInput::new(Key::Char('/'))).unwrap();
    assert_eq!(
        editor.drain_events(),
        vec![EditorEvent::CommandMenuRequested { block_id: id("a") }]
    );
}

// ---------------------------------------------------------------------------
// Content, properties and actions
// ---------------------------------------------------------------------------

#[test]
fn test_set_property_checks_schema() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);

    let err = editor.set_property(&id("a"), "opacity", json!(2.5));
    assert!(matches!(err, Err(EditorError::Block(_))));
    assert!(editor.find_block(&id("a")).unwrap().property("opacity").is_none());

    editor.set_property(&id("a"), "opacity", json!(0.5)).unwrap();
    editor.set_property(&id("a"), "customFlag", json!("free-form")).unwrap();
    let block = editor.find_block(&id("a")).unwrap();
    assert_eq!(block.property("opacity"), Some(&json!(0.5)));
    assert_eq!(block.property("customFlag"), Some(&json!("free-form")));
    assert_eq!(
        changed_types(&editor.drain_events()),
        vec!["property-change", "property-change"]
    );
}

#[test]
fn test_reset_properties_keeps_variant_state() {
    let (mut editor, _) = editor_with(vec![BlockData::new("todoListItem")
        .with_id("t")
        .with_property("checked", true)
        .with_property("backgroundColor", "#fee")
        .with_property("borderStyle", "dashed")]);

    assert_eq!(editor.reset_properties(&id("t")).unwrap(), 2);
    let block = editor.find_block(&id("t")).unwrap();
    assert!(block.property("backgroundColor").is_none());
    assert!(block.property("borderStyle").is_none());
    assert_eq!(block.property("checked"), Some(&json!(true)));
    assert!(changed_types(&editor.drain_events()).contains(&"reset-props".to_string()));

    assert_eq!(editor.reset_properties(&id("t")).unwrap(), 0);
}

#[test]
fn test_handle_action_changes_and_notifies() {
    let (mut editor, _) = editor_with(vec![BlockData::new("todoListItem").with_id("t")]);
    let outcome = editor
        .handle_action(&id("t"), &ActionRequest::new("toggleChecked"))
        .unwrap();
    assert_eq!(outcome, ActionOutcome::changed("toggle-todo"));
    assert_eq!(
        editor.find_block(&id("t")).unwrap().property("checked"),
        Some(&json!(true))
    );
    assert_eq!(changed_types(&editor.drain_events()), vec!["toggle-todo"]);
}

#[test]
fn test_delegated_action_is_silent() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    let outcome = editor.handle_action(&id("a"), &ActionRequest::new("bold")).unwrap();
    assert_eq!(outcome, ActionOutcome::Delegated);
    assert!(changed_types(&editor.drain_events()).is_empty());
}

#[test]
fn test_invalid_action_argument_leaves_block() {
    let (mut editor, _) = editor_with(vec![BlockData::new("numberedListItem")
        .with_id("n")
        .with_property("number", 2)]);
    let err = editor.handle_action(&id("n"), &ActionRequest::new("setStartNumber").with_value(0));
    assert!(matches!(err, Err(EditorError::Block(_))));
    assert_eq!(
        editor.find_block(&id("n")).unwrap().property("number"),
        Some(&json!(2))
    );

    let err = editor.handle_action(&id("n"), &ActionRequest::new("noSuchAction"));
    assert!(matches!(err, Err(EditorError::Block(_))));
}

#[test]
fn test_save_reconciles_and_cleans() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    editor.report_input(&id("a"), "draft text").unwrap();
    assert!(editor.is_dirty());

    let saved = editor.save().unwrap();
    assert_eq!(saved[0].content, "draft text");
    assert!(!editor.is_dirty());
    assert_eq!(editor.find_block(&id("a")).unwrap().content(), "draft text");
}

#[test]
fn test_update_content() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "old")]);
    editor.update_content(&id("a"), "<i>new</i>").unwrap();
    assert_eq!(editor.find_block(&id("a")).unwrap().content(), "<i>new</i>");
    let events = editor.drain_events();
    assert!(events.contains(&EditorEvent::Render { block_id: id("a") }));
    assert_eq!(changed_types(&events), vec!["update-content"]);
}

// ---------------------------------------------------------------------------
// Change notifications
// ---------------------------------------------------------------------------

#[test]
fn test_changes_bubble_to_pinned_ancestors() {
    let index = ReferenceIndex::new();
    let mut editor = Editor::new(BlockRegistry::with_builtin_blocks(), EditorConfig::default())
        .with_clock(Arc::new(ManualClock::new()))
        .with_reference_index(index.clone());

    let data = vec![BlockData::new("container")
        .with_id("box")
        .with_children(vec![paragraph("p", "before")])];
    editor.load_page(Some(PAGE), &data);
    index.add(PAGE, data[0].clone());
    index.add("elsewhere.json", paragraph("p", "unrelated"));

    editor.update_content(&id("p"), "after").unwrap();

    let pinned = index.references_for(PAGE);
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].block.children[0].content, "after");
    assert_eq!(index.references_for("elsewhere.json")[0].block.content, "unrelated");

    editor.delete_block(&id("box")).unwrap();
    assert!(!index.has_references_for(PAGE));
}

#[test]
fn test_emit_change_without_history() {
    let (mut editor, _) = editor_with(vec![paragraph("a", "")]);
    editor.emit_change(false, "external", Some(&id("a"))).unwrap();
    assert!(editor.is_dirty());
    assert_eq!(editor.history().undo_len(), 0);

    match editor.drain_events().pop() {
        Some(EditorEvent::Changed(n)) => {
            assert!(!n.record_history);
            assert_eq!(n.origin, Some(id("a")));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_event_wire_format() {
    let event = EditorEvent::Focus { block_id: id("a") };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({ "kind": "focus", "blockId": "a" })
    );
}
