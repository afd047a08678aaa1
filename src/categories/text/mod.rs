//! Text-bearing block implementations
//!
//! Paragraphs, headings and code blocks, plus the key handling and toolbar shared by
//! every block that carries editable inline text (list items reuse them).

pub mod code;
pub mod text_block;

pub use code::CodeBlock;
pub use text_block::TextBlock;

use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, Key, KeyInput, KeyOutcome,
    ToolbarAction,
};

/// Inline formatting entries, applied by the rendering surface.
pub const FORMAT_ACTIONS: [ToolbarAction; 6] = [
    ToolbarAction::new("bold", "Bold", "bold"),
    ToolbarAction::new("italic", "Italic", "italic"),
    ToolbarAction::new("underline", "Underline", "underline"),
    ToolbarAction::new("strikeThrough", "Strikethrough", "strikethrough"),
    ToolbarAction::new("colorPicker", "Text Color", "palette"),
    ToolbarAction::new("link", "Link", "link"),
];

/// `specific`, then formatting, then the generic entries.
pub fn text_toolbar(specific: &[ToolbarAction]) -> Vec<ToolbarAction> {
    let mut actions = specific.to_vec();
    actions.extend_from_slice(&FORMAT_ACTIONS);
    actions.push(ToolbarAction::SHOW_DETAILS);
    actions
}

/// Key handling for text-bearing blocks.
///
/// Enter inserts `template` after the block; Enter with a modifier is a
/// soft break; Backspace/Delete on empty content deletes the block.
pub fn text_key_input(block: &Block, key: &KeyInput, template: BlockData) -> KeyOutcome {
    match key.key {
        Key::Enter if key.has_modifier() => KeyOutcome::SoftBreak,
        Key::Enter => KeyOutcome::InsertAfter(template),
        Key::Backspace | Key::Delete if block.is_content_empty() => KeyOutcome::DeleteSelf,
        Key::Char('/') => KeyOutcome::OpenCommandMenu,
        _ => KeyOutcome::Ignored,
    }
}

/// Formatting and details actions; anything else is unknown.
pub fn handle_text_action(action: &ActionRequest) -> Result<ActionOutcome, BlockError> {
    let id = action.id.as_str();
    if id == ToolbarAction::SHOW_DETAILS.id || FORMAT_ACTIONS.iter().any(|a| a.id == id) {
        Ok(ActionOutcome::Delegated)
    } else {
        Err(BlockError::UnknownAction(id.to_string()))
    }
}
