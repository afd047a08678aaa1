//! Shared fixtures

use std::sync::Arc;

use crate::config::EditorConfig;
use crate::core::{BlockData, BlockId, BlockRegistry};
use crate::runtime::{Editor, EditorEvent, ManualClock};

pub const PAGE: &str = "page.json";

/// Route engine logs to the test harness output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Editor on a manual clock with `data` loaded and the outbox drained.
pub fn editor_with(data: Vec<BlockData>) -> (Editor, ManualClock) {
    editor_with_config(data, EditorConfig::default())
}

pub fn editor_with_config(data: Vec<BlockData>, config: EditorConfig) -> (Editor, ManualClock) {
    init_tracing();
    let clock = ManualClock::new();
    let mut editor = Editor::new(BlockRegistry::with_builtin_blocks(), config)
        .with_clock(Arc::new(clock.clone()));
    editor.load_page(Some(PAGE), &data);
    editor.drain_events();
    (editor, clock)
}

pub fn paragraph(id: &str, content: &str) -> BlockData {
    BlockData::new("paragraph").with_id(id).with_content(content)
}

pub fn id(s: &str) -> BlockId {
    BlockId::from(s)
}

/// Root ids in order.
pub fn root_ids(editor: &Editor) -> Vec<String> {
    editor.blocks().iter().map(|b| b.id().to_string()).collect()
}

pub fn changed_types(events: &[EditorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EditorEvent::Changed(n) => Some(n.action_type.clone()),
            _ => None,
        })
        .collect()
}
