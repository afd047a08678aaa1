//! Paragraph and heading blocks

use crate::categories::BlockCategory;
use crate::core::parameter::{compose_schema, PropertyField};
use crate::core::registry::BlockRegistry;
use crate::core::{
    ActionOutcome, ActionRequest, Block, BlockData, BlockError, BlockMetadata, BlockVariant,
    KeyInput, KeyOutcome, ToolbarAction,
};

use super::{handle_text_action, text_key_input, text_toolbar};

/// Plain text block; `level` 0 is a paragraph, 1-3 are headings.
pub struct TextBlock {
    metadata: BlockMetadata,
    level: u8,
}

impl TextBlock {
    pub fn paragraph() -> Self {
        Self {
            metadata: BlockMetadata::new("paragraph", "Text", "text", BlockCategory::Text)
                .with_description("Just start writing with plain text")
                .with_keywords(&["paragraph", "text", "plain"]),
            level: 0,
        }
    }

    /// Heading of level 1-3; other levels are clamped into that range.
    pub fn heading(level: u8) -> Self {
        let level = level.clamp(1, 3);
        let block_type = format!("heading{}", level);
        let label = format!("Heading {}", level);
        let description = match level {
            1 => "Big section heading",
            2 => "Medium section heading",
            _ => "Small section heading",
        };
        Self {
            metadata: BlockMetadata::new(&block_type, &label, &format!("h{}", level), BlockCategory::Text)
                .with_description(description)
                .with_keywords(&["heading", "title", "h"]),
            level,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl BlockVariant for TextBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn properties_schema(&self) -> Vec<PropertyField> {
        compose_schema(vec![
            PropertyField::color("color", "Text Color"),
            PropertyField::select("textAlign", "Alignment", &["left", "center", "right", "justify"]),
        ])
    }

    fn toolbar_actions(&self) -> Vec<ToolbarAction> {
        text_toolbar(&[])
    }

    /// Enter after a heading starts a paragraph.
    fn next_block_template(&self, _block: &Block) -> BlockData {
        BlockData::new("paragraph")
    }

    fn handle_key_input(&self, block: &Block, key: &KeyInput) -> KeyOutcome {
        text_key_input(block, key, self.next_block_template(block))
    }

    fn handle_action(
        &self,
        _block: &mut Block,
        action: &ActionRequest,
        _registry: &BlockRegistry,
    ) -> Result<ActionOutcome, BlockError> {
        handle_text_action(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Key;

    fn block(registry: &BlockRegistry, block_type: &str, content: &str) -> Block {
        registry
            .create_block_instance(&BlockData::new(block_type).with_content(content))
            .unwrap()
    }

    #[test]
    fn test_heading_types() {
        assert_eq!(TextBlock::heading(2).metadata().block_type, "heading2");
        assert_eq!(TextBlock::heading(9).level(), 3);
    }

    #[test]
    fn test_enter_inserts_paragraph_after_heading() {
        let registry = BlockRegistry::with_builtin_blocks();
        let heading = block(&registry, "heading1", "Title");
        let outcome = heading
            .variant()
            .handle_key_input(&heading, &KeyInput::new(Key::Enter));
        assert_eq!(outcome, KeyOutcome::InsertAfter(BlockData::new("paragraph")));
    }

    #[test]
    fn test_shift_enter_is_soft_break() {
        let registry = BlockRegistry::with_builtin_blocks();
        let para = block(&registry, "paragraph", "Hello");
        let outcome = para
            .variant()
            .handle_key_input(&para, &KeyInput::new(Key::Enter).with_shift());
        assert_eq!(outcome, KeyOutcome::SoftBreak);
    }

    #[test]
    fn test_backspace_on_empty_deletes() {
        let registry = BlockRegistry::with_builtin_blocks();
        let empty = block(&registry, "paragraph", "<br>");
        let full = block(&registry, "paragraph", "x");
        let backspace = KeyInput::new(Key::Backspace);

        assert_eq!(
            empty.variant().handle_key_input(&empty, &backspace),
            KeyOutcome::DeleteSelf
        );
        assert_eq!(
            full.variant().handle_key_input(&full, &backspace),
            KeyOutcome::Ignored
        );
    }

    #[test]
    fn test_toolbar_order() {
        let ids: Vec<&str> = TextBlock::paragraph()
            .toolbar_actions()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids.first(), Some(&"bold"));
        assert_eq!(ids.last(), Some(&"showDetails"));
    }

    #[test]
    fn test_format_actions_are_delegated() {
        let registry = BlockRegistry::with_builtin_blocks();
        let mut para = block(&registry, "paragraph", "x");
        let variant = para.variant().clone();
        let outcome = variant
            .handle_action(&mut para, &ActionRequest::new("bold"), &registry)
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Delegated);
        assert!(variant
            .handle_action(&mut para, &ActionRequest::new("explode"), &registry)
            .is_err());
    }
}
